//! Fee store backed by PostgreSQL.
//!
//! `PgFeeTx` wraps one tenant transaction. Locked reads use
//! `SELECT ... FOR UPDATE`; receipt numbers come from an upserted counter row
//! so two payments in the same year serialize on it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    Statement,
};
use sodalis_core::fee::{
    Fee, FeeError, FeeFilter, FeeStatus, FeeStore, FeeTransaction, LedgerMovement, Member,
    MorosoEntry, Receipt, SocialYear,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{
    fees, members, movement_categories, movements, receipts,
    sea_orm_active_enums as db_enums, social_years,
};
use crate::tenant::{TenantConnection, TenantError};

/// Category code of the ledger category that receives fee income.
pub const FEE_INCOME_CATEGORY: &str = "membership_fees";

const NEXT_RECEIPT_SEQUENCE_SQL: &str = r"
INSERT INTO receipt_counters (year, last_sequence)
VALUES ($1, 1)
ON CONFLICT (year) DO UPDATE SET last_sequence = receipt_counters.last_sequence + 1
RETURNING last_sequence
";

const MOROSI_SQL: &str = r"
SELECT m.id AS member_id, m.first_name, m.last_name, m.email,
       COUNT(f.id) AS overdue_fees, SUM(f.amount) AS overdue_amount
FROM fees f
JOIN members m ON m.id = f.member_id
WHERE f.social_year_id = $1 AND f.status = 'overdue'
GROUP BY m.id, m.first_name, m.last_name, m.email
ORDER BY m.last_name, m.first_name
";

/// Maps a database error onto the coordinator's error taxonomy.
///
/// Lost connections surface as `Unavailable`; everything else aborted the
/// unit of work and is a `Persistence` failure.
pub fn store_error(err: DbErr) -> FeeError {
    match &err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => FeeError::Unavailable(err.to_string()),
        _ => FeeError::Persistence(err.to_string()),
    }
}

fn tenant_error(err: TenantError) -> FeeError {
    match err {
        TenantError::Database(db) => store_error(db),
        TenantError::InvalidSchema(_) => FeeError::Persistence(err.to_string()),
    }
}

impl From<fees::Model> for Fee {
    fn from(model: fees::Model) -> Self {
        Self {
            id: model.id,
            member_id: model.member_id,
            social_year_id: model.social_year_id,
            fee_type: model.fee_type,
            amount: model.amount,
            due_date: model.due_date,
            paid_date: model.paid_date,
            payment_method: model.payment_method.map(Into::into),
            receipt_number: model.receipt_number,
            status: model.status.into(),
            payment_pending: model.payment_pending,
            payment_reference: model.payment_reference,
            notes: model.notes,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<receipts::Model> for Receipt {
    fn from(model: receipts::Model) -> Self {
        Self {
            id: model.id,
            fee_id: model.fee_id,
            year: model.year,
            // Guarded by chk_receipt_sequence_positive.
            sequence: model.sequence.unsigned_abs(),
            receipt_number: model.receipt_number,
            payment_method: model.payment_method.into(),
            payment_details: model.payment_details,
            issued_by: model.issued_by,
            generated_at: model.generated_at.with_timezone(&Utc),
        }
    }
}

fn fee_active_model(fee: &Fee) -> fees::ActiveModel {
    fees::ActiveModel {
        id: Set(fee.id),
        member_id: Set(fee.member_id),
        social_year_id: Set(fee.social_year_id),
        fee_type: Set(fee.fee_type.clone()),
        amount: Set(fee.amount),
        due_date: Set(fee.due_date),
        paid_date: Set(fee.paid_date),
        payment_method: Set(fee.payment_method.map(Into::into)),
        receipt_number: Set(fee.receipt_number.clone()),
        status: Set(fee.status.into()),
        payment_pending: Set(fee.payment_pending),
        payment_reference: Set(fee.payment_reference.clone()),
        notes: Set(fee.notes.clone()),
        created_at: Set(fee.created_at.into()),
        updated_at: Set(fee.updated_at.into()),
    }
}

fn movement_active_model(movement: &LedgerMovement) -> movements::ActiveModel {
    movements::ActiveModel {
        id: Set(movement.id),
        movement_type: Set(movement.movement_type.into()),
        category_id: Set(movement.category_id),
        description: Set(movement.description.clone()),
        amount: Set(movement.amount),
        paid_at: Set(movement.paid_at),
        social_year_id: Set(movement.social_year_id),
        member_id: Set(movement.member_id),
        payment_method: Set(movement.payment_method.map(Into::into)),
        receipt_number: Set(movement.receipt_number.clone()),
        notes: Set(movement.notes.clone()),
        source_fee_id: Set(movement.source_fee_id),
        created_at: Set(movement.created_at.into()),
    }
}

fn receipt_active_model(receipt: &Receipt) -> Result<receipts::ActiveModel, FeeError> {
    let sequence = i32::try_from(receipt.sequence).map_err(|_| {
        FeeError::Persistence(format!("receipt sequence {} out of range", receipt.sequence))
    })?;
    Ok(receipts::ActiveModel {
        id: Set(receipt.id),
        fee_id: Set(receipt.fee_id),
        year: Set(receipt.year),
        sequence: Set(sequence),
        receipt_number: Set(receipt.receipt_number.clone()),
        payment_method: Set(receipt.payment_method.into()),
        payment_details: Set(receipt.payment_details.clone()),
        issued_by: Set(receipt.issued_by),
        generated_at: Set(receipt.generated_at.into()),
    })
}

#[derive(Debug, FromQueryResult)]
struct MorosoRow {
    member_id: Uuid,
    first_name: String,
    last_name: String,
    email: Option<String>,
    overdue_fees: i64,
    overdue_amount: Decimal,
}

impl From<MorosoRow> for MorosoEntry {
    fn from(row: MorosoRow) -> Self {
        Self {
            member_id: row.member_id,
            member_name: format!("{} {}", row.last_name, row.first_name),
            email: row.email,
            overdue_fees: row.overdue_fees.unsigned_abs(),
            overdue_amount: row.overdue_amount,
        }
    }
}

/// Fee store over a tenant schema.
#[derive(Debug, Clone)]
pub struct PgFeeStore {
    db: DatabaseConnection,
    schema: String,
}

impl PgFeeStore {
    /// Creates a new fee store for the given tenant schema.
    #[must_use]
    pub const fn new(db: DatabaseConnection, schema: String) -> Self {
        Self { db, schema }
    }

    async fn open(&self) -> Result<TenantConnection, FeeError> {
        TenantConnection::begin(&self.db, &self.schema)
            .await
            .map_err(tenant_error)
    }
}

impl FeeStore for PgFeeStore {
    type Tx = PgFeeTx;

    async fn begin(&self) -> Result<PgFeeTx, FeeError> {
        Ok(PgFeeTx {
            conn: self.open().await?,
        })
    }

    async fn find_fee(&self, id: Uuid) -> Result<Option<Fee>, FeeError> {
        let conn = self.open().await?;
        let fee = fees::Entity::find_by_id(id)
            .one(conn.transaction())
            .await
            .map_err(store_error)?;
        conn.commit().await.map_err(store_error)?;
        Ok(fee.map(Fee::from))
    }

    async fn list_fees(
        &self,
        filter: &FeeFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Fee>, u64), FeeError> {
        let mut query = fees::Entity::find();
        if let Some(id) = filter.social_year_id {
            query = query.filter(fees::Column::SocialYearId.eq(id));
        }
        if let Some(id) = filter.member_id {
            query = query.filter(fees::Column::MemberId.eq(id));
        }
        if let Some(status) = filter.status {
            query = query.filter(fees::Column::Status.eq(db_enums::FeeStatus::from(status)));
        }
        if let Some(pending) = filter.payment_pending {
            query = query.filter(fees::Column::PaymentPending.eq(pending));
        }

        let conn = self.open().await?;
        let total = query
            .clone()
            .count(conn.transaction())
            .await
            .map_err(store_error)?;
        let rows = query
            .order_by_asc(fees::Column::DueDate)
            .order_by_asc(fees::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(conn.transaction())
            .await
            .map_err(store_error)?;
        conn.commit().await.map_err(store_error)?;

        Ok((rows.into_iter().map(Fee::from).collect(), total))
    }

    async fn find_receipt(&self, fee_id: Uuid) -> Result<Option<Receipt>, FeeError> {
        let conn = self.open().await?;
        let receipt = receipts::Entity::find()
            .filter(receipts::Column::FeeId.eq(fee_id))
            .one(conn.transaction())
            .await
            .map_err(store_error)?;
        conn.commit().await.map_err(store_error)?;
        Ok(receipt.map(Receipt::from))
    }

    async fn movements_for_fee(&self, fee_id: Uuid) -> Result<Vec<LedgerMovement>, FeeError> {
        let conn = self.open().await?;
        let rows = movements::Entity::find()
            .filter(movements::Column::SourceFeeId.eq(fee_id))
            .all(conn.transaction())
            .await
            .map_err(store_error)?;
        conn.commit().await.map_err(store_error)?;
        Ok(rows.into_iter().map(LedgerMovement::from).collect())
    }

    async fn mark_overdue(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<u64, FeeError> {
        let conn = self.open().await?;
        let result = fees::Entity::update_many()
            .col_expr(
                fees::Column::Status,
                Expr::value(db_enums::FeeStatus::Overdue),
            )
            .col_expr(fees::Column::UpdatedAt, Expr::value(now))
            .filter(fees::Column::Status.eq(db_enums::FeeStatus::Pending))
            .filter(fees::Column::DueDate.lt(today))
            .exec(conn.transaction())
            .await
            .map_err(store_error)?;
        conn.commit().await.map_err(store_error)?;
        debug!(changed = result.rows_affected, %today, "Overdue sweep applied");
        Ok(result.rows_affected)
    }

    async fn count_members_with_overdue(&self, social_year_id: Uuid) -> Result<u64, FeeError> {
        let conn = self.open().await?;
        let count = fees::Entity::find()
            .select_only()
            .column(fees::Column::MemberId)
            .distinct()
            .filter(fees::Column::SocialYearId.eq(social_year_id))
            .filter(fees::Column::Status.eq(db_enums::FeeStatus::Overdue))
            .count(conn.transaction())
            .await
            .map_err(store_error)?;
        conn.commit().await.map_err(store_error)?;
        Ok(count)
    }

    async fn sum_amounts(
        &self,
        social_year_id: Uuid,
        statuses: &[FeeStatus],
    ) -> Result<Decimal, FeeError> {
        let statuses: Vec<db_enums::FeeStatus> = statuses.iter().copied().map(Into::into).collect();
        let conn = self.open().await?;
        let total: Option<Option<Decimal>> = fees::Entity::find()
            .select_only()
            .column_as(fees::Column::Amount.sum(), "total")
            .filter(fees::Column::SocialYearId.eq(social_year_id))
            .filter(fees::Column::Status.is_in(statuses))
            .into_tuple()
            .one(conn.transaction())
            .await
            .map_err(store_error)?;
        conn.commit().await.map_err(store_error)?;
        Ok(total.flatten().unwrap_or(Decimal::ZERO))
    }

    async fn pending_due_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Fee>, FeeError> {
        let conn = self.open().await?;
        let rows = fees::Entity::find()
            .filter(fees::Column::Status.eq(db_enums::FeeStatus::Pending))
            .filter(fees::Column::DueDate.between(from, to))
            .order_by_asc(fees::Column::DueDate)
            .order_by_asc(fees::Column::Id)
            .all(conn.transaction())
            .await
            .map_err(store_error)?;
        conn.commit().await.map_err(store_error)?;
        Ok(rows.into_iter().map(Fee::from).collect())
    }

    async fn morosi(&self, social_year_id: Uuid) -> Result<Vec<MorosoEntry>, FeeError> {
        let conn = self.open().await?;
        let rows = MorosoRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            MOROSI_SQL,
            [social_year_id.into()],
        ))
        .all(conn.transaction())
        .await
        .map_err(store_error)?;
        conn.commit().await.map_err(store_error)?;
        Ok(rows.into_iter().map(MorosoEntry::from).collect())
    }
}

/// One fee unit of work.
///
/// Dropping it without `commit` rolls back every write.
pub struct PgFeeTx {
    conn: TenantConnection,
}

impl FeeTransaction for PgFeeTx {
    async fn lock_fee(&mut self, id: Uuid) -> Result<Option<Fee>, FeeError> {
        let fee = fees::Entity::find_by_id(id)
            .lock_exclusive()
            .one(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(fee.map(Fee::from))
    }

    async fn lock_social_year(&mut self, id: Uuid) -> Result<Option<SocialYear>, FeeError> {
        let year = social_years::Entity::find_by_id(id)
            .lock_exclusive()
            .one(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(year.map(SocialYear::from))
    }

    async fn find_social_year(&mut self, id: Uuid) -> Result<Option<SocialYear>, FeeError> {
        let year = social_years::Entity::find_by_id(id)
            .one(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(year.map(SocialYear::from))
    }

    async fn find_member(&mut self, id: Uuid) -> Result<Option<Member>, FeeError> {
        let member = members::Entity::find_by_id(id)
            .one(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(member.map(Member::from))
    }

    async fn member_has_fee(
        &mut self,
        member_id: Uuid,
        social_year_id: Uuid,
    ) -> Result<bool, FeeError> {
        let count = fees::Entity::find()
            .filter(fees::Column::MemberId.eq(member_id))
            .filter(fees::Column::SocialYearId.eq(social_year_id))
            .count(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(count > 0)
    }

    async fn previous_fee_amount(
        &mut self,
        member_id: Uuid,
        before: NaiveDate,
    ) -> Result<Option<Decimal>, FeeError> {
        let fee = fees::Entity::find()
            .inner_join(social_years::Entity)
            .filter(fees::Column::MemberId.eq(member_id))
            .filter(social_years::Column::StartDate.lt(before))
            .order_by_desc(social_years::Column::StartDate)
            .order_by_desc(fees::Column::CreatedAt)
            .one(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(fee.map(|f| f.amount))
    }

    async fn insert_fee(&mut self, fee: &Fee) -> Result<(), FeeError> {
        fee_active_model(fee)
            .insert(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn update_fee(&mut self, fee: &Fee) -> Result<(), FeeError> {
        fee_active_model(fee)
            .update(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_fee(&mut self, id: Uuid) -> Result<(), FeeError> {
        fees::Entity::delete_by_id(id)
            .exec(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &LedgerMovement) -> Result<(), FeeError> {
        movement_active_model(movement)
            .insert(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_movements_for_fee(&mut self, fee_id: Uuid) -> Result<u64, FeeError> {
        let result = movements::Entity::delete_many()
            .filter(movements::Column::SourceFeeId.eq(fee_id))
            .exec(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected)
    }

    async fn fee_income_category(&mut self) -> Result<Uuid, FeeError> {
        let category = movement_categories::Entity::find()
            .filter(movement_categories::Column::Code.eq(FEE_INCOME_CATEGORY))
            .one(self.conn.transaction())
            .await
            .map_err(store_error)?;
        category.map(|c| c.id).ok_or_else(|| {
            FeeError::Persistence(format!("ledger category '{FEE_INCOME_CATEGORY}' is missing"))
        })
    }

    async fn next_receipt_sequence(&mut self, year: i32) -> Result<u32, FeeError> {
        let row = self
            .conn
            .transaction()
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                NEXT_RECEIPT_SEQUENCE_SQL,
                [year.into()],
            ))
            .await
            .map_err(store_error)?
            .ok_or_else(|| FeeError::Persistence("receipt counter returned no row".into()))?;
        let sequence: i32 = row.try_get("", "last_sequence").map_err(store_error)?;
        // Guarded by chk_counter_positive.
        Ok(sequence.unsigned_abs())
    }

    async fn receipt_for_fee(&mut self, fee_id: Uuid) -> Result<Option<Receipt>, FeeError> {
        let receipt = receipts::Entity::find()
            .filter(receipts::Column::FeeId.eq(fee_id))
            .one(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(receipt.map(Receipt::from))
    }

    async fn insert_receipt(&mut self, receipt: &Receipt) -> Result<(), FeeError> {
        receipt_active_model(receipt)?
            .insert(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_receipt_for_fee(&mut self, fee_id: Uuid) -> Result<u64, FeeError> {
        let result = receipts::Entity::delete_many()
            .filter(receipts::Column::FeeId.eq(fee_id))
            .exec(self.conn.transaction())
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected)
    }

    async fn commit(self) -> Result<(), FeeError> {
        self.conn.commit().await.map_err(store_error)
    }

    async fn rollback(self) -> Result<(), FeeError> {
        self.conn.rollback().await.map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::RuntimeErr;

    #[test]
    fn test_connection_errors_are_unavailable() {
        let err = store_error(DbErr::Conn(RuntimeErr::Internal("refused".into())));
        assert!(matches!(err, FeeError::Unavailable(_)));
        assert_eq!(err.http_status_code(), 503);
    }

    #[test]
    fn test_query_errors_are_persistence() {
        let err = store_error(DbErr::Custom("unique violation".into()));
        assert!(matches!(err, FeeError::Persistence(_)));
        assert_eq!(err.http_status_code(), 500);
    }

    #[test]
    fn test_invalid_schema_is_persistence() {
        let err = tenant_error(TenantError::InvalidSchema("bad name".into()));
        assert!(matches!(err, FeeError::Persistence(_)));
    }

    #[test]
    fn test_receipt_model_conversion() {
        let now = Utc::now();
        let model = receipts::Model {
            id: Uuid::nil(),
            fee_id: Uuid::nil(),
            year: 2024,
            sequence: 12,
            receipt_number: "2024/0012".into(),
            payment_method: db_enums::PaymentMethod::BankTransfer,
            payment_details: Some("CRO 123".into()),
            issued_by: Uuid::nil(),
            generated_at: now.into(),
        };
        let receipt = Receipt::from(model);
        assert_eq!(receipt.sequence, 12);
        assert_eq!(receipt.payment_method, sodalis_core::fee::PaymentMethod::BankTransfer);
        assert_eq!(receipt.generated_at, now);
    }
}
