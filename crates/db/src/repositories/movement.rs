//! Ledger movement repository.
//!
//! Fee income movements are written by the fee store inside the payment
//! transaction; this repository only reads the ledger.

use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use sodalis_core::fee::LedgerMovement;
use uuid::Uuid;

use super::RepositoryError;
use crate::entities::movements;
use crate::tenant::TenantConnection;

impl From<movements::Model> for LedgerMovement {
    fn from(model: movements::Model) -> Self {
        Self {
            id: model.id,
            movement_type: model.movement_type.into(),
            category_id: model.category_id,
            description: model.description,
            amount: model.amount,
            paid_at: model.paid_at,
            social_year_id: model.social_year_id,
            member_id: model.member_id,
            payment_method: model.payment_method.map(Into::into),
            receipt_number: model.receipt_number,
            notes: model.notes,
            source_fee_id: model.source_fee_id,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Movement repository for ledger reads.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    db: DatabaseConnection,
    schema: String,
}

impl MovementRepository {
    /// Creates a new movement repository for the given tenant schema.
    #[must_use]
    pub const fn new(db: DatabaseConnection, schema: String) -> Self {
        Self { db, schema }
    }

    /// Lists movements, newest first, optionally restricted to one social year.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        social_year_id: Option<Uuid>,
    ) -> Result<Vec<LedgerMovement>, RepositoryError> {
        let mut query = movements::Entity::find();
        if let Some(id) = social_year_id {
            query = query.filter(movements::Column::SocialYearId.eq(id));
        }

        let conn = TenantConnection::begin(&self.db, &self.schema).await?;
        let rows = query
            .order_by_desc(movements::Column::PaidAt)
            .order_by_desc(movements::Column::CreatedAt)
            .all(conn.transaction())
            .await?;
        conn.commit().await?;
        Ok(rows.into_iter().map(LedgerMovement::from).collect())
    }
}
