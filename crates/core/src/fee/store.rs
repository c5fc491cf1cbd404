//! Persistence seams for the fee coordinator.
//!
//! These traits are implemented by the db crate. A `FeeTransaction` is one
//! atomic unit: nothing it writes is visible until `commit`, and dropping it
//! without committing discards every write.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::FeeError;
use super::types::{
    Fee, FeeFilter, FeeStatus, LedgerMovement, Member, MorosoEntry, Receipt, SocialYear,
};

/// Read access plus the entry point for transactional writes.
pub trait FeeStore: Send + Sync {
    /// Transaction type produced by `begin`.
    type Tx: FeeTransaction;

    /// Opens a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, FeeError>> + Send;

    /// Find a fee by ID.
    fn find_fee(&self, id: Uuid) -> impl Future<Output = Result<Option<Fee>, FeeError>> + Send;

    /// List fees matching a filter, ordered by due date, with the total match count.
    fn list_fees(
        &self,
        filter: &FeeFilter,
        offset: u64,
        limit: u64,
    ) -> impl Future<Output = Result<(Vec<Fee>, u64), FeeError>> + Send;

    /// Receipt attached to a fee.
    fn find_receipt(
        &self,
        fee_id: Uuid,
    ) -> impl Future<Output = Result<Option<Receipt>, FeeError>> + Send;

    /// Movements created from a fee.
    fn movements_for_fee(
        &self,
        fee_id: Uuid,
    ) -> impl Future<Output = Result<Vec<LedgerMovement>, FeeError>> + Send;

    /// Sets every pending fee due before `today` to overdue in one statement,
    /// stamping `updated_at` with `now`. Returns the number of fees changed.
    fn mark_overdue(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, FeeError>> + Send;

    /// Number of distinct members with at least one overdue fee in the year.
    fn count_members_with_overdue(
        &self,
        social_year_id: Uuid,
    ) -> impl Future<Output = Result<u64, FeeError>> + Send;

    /// Sum of fee amounts in the year whose status is one of `statuses`.
    fn sum_amounts(
        &self,
        social_year_id: Uuid,
        statuses: &[FeeStatus],
    ) -> impl Future<Output = Result<Decimal, FeeError>> + Send;

    /// Pending fees with `from <= due_date <= to`, ordered by due date.
    fn pending_due_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = Result<Vec<Fee>, FeeError>> + Send;

    /// Members with overdue fees in the year, ordered by name.
    fn morosi(
        &self,
        social_year_id: Uuid,
    ) -> impl Future<Output = Result<Vec<MorosoEntry>, FeeError>> + Send;
}

/// Writes and locked reads inside one atomic unit.
pub trait FeeTransaction: Send {
    /// Loads a fee and locks it until the transaction ends.
    fn lock_fee(&mut self, id: Uuid) -> impl Future<Output = Result<Option<Fee>, FeeError>> + Send;

    /// Loads a social year and locks it until the transaction ends.
    fn lock_social_year(
        &mut self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<SocialYear>, FeeError>> + Send;

    /// Loads a social year.
    fn find_social_year(
        &mut self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<SocialYear>, FeeError>> + Send;

    /// Loads a member.
    fn find_member(
        &mut self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Member>, FeeError>> + Send;

    /// Returns true if the member already has a fee in the social year.
    fn member_has_fee(
        &mut self,
        member_id: Uuid,
        social_year_id: Uuid,
    ) -> impl Future<Output = Result<bool, FeeError>> + Send;

    /// Amount of the member's fee in the latest social year starting before `before`.
    fn previous_fee_amount(
        &mut self,
        member_id: Uuid,
        before: NaiveDate,
    ) -> impl Future<Output = Result<Option<Decimal>, FeeError>> + Send;

    /// Inserts a fee.
    fn insert_fee(&mut self, fee: &Fee) -> impl Future<Output = Result<(), FeeError>> + Send;

    /// Overwrites a fee row.
    fn update_fee(&mut self, fee: &Fee) -> impl Future<Output = Result<(), FeeError>> + Send;

    /// Deletes a fee row.
    fn delete_fee(&mut self, id: Uuid) -> impl Future<Output = Result<(), FeeError>> + Send;

    /// Inserts a movement.
    fn insert_movement(
        &mut self,
        movement: &LedgerMovement,
    ) -> impl Future<Output = Result<(), FeeError>> + Send;

    /// Deletes the movements created from a fee. Returns how many were removed.
    fn delete_movements_for_fee(
        &mut self,
        fee_id: Uuid,
    ) -> impl Future<Output = Result<u64, FeeError>> + Send;

    /// Ledger category for membership fee income.
    fn fee_income_category(&mut self) -> impl Future<Output = Result<Uuid, FeeError>> + Send;

    /// Atomically increments and returns the receipt counter for `year`.
    fn next_receipt_sequence(
        &mut self,
        year: i32,
    ) -> impl Future<Output = Result<u32, FeeError>> + Send;

    /// Receipt attached to a fee.
    fn receipt_for_fee(
        &mut self,
        fee_id: Uuid,
    ) -> impl Future<Output = Result<Option<Receipt>, FeeError>> + Send;

    /// Inserts a receipt.
    fn insert_receipt(
        &mut self,
        receipt: &Receipt,
    ) -> impl Future<Output = Result<(), FeeError>> + Send;

    /// Deletes the receipt attached to a fee. Returns how many were removed.
    fn delete_receipt_for_fee(
        &mut self,
        fee_id: Uuid,
    ) -> impl Future<Output = Result<u64, FeeError>> + Send;

    /// Makes every write visible.
    fn commit(self) -> impl Future<Output = Result<(), FeeError>> + Send;

    /// Discards every write.
    fn rollback(self) -> impl Future<Output = Result<(), FeeError>> + Send;
}
