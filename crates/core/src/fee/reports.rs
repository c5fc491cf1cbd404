//! Read-only reporting over fees.
//!
//! None of these run the overdue sweep; callers that need current statuses
//! call `update_overdue_statuses` first.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::audit::AuditLog;
use super::coordinator::FeeLedgerCoordinator;
use super::error::FeeError;
use super::notify::Notifier;
use super::store::FeeStore;
use super::types::{Fee, FeeStatus, MorosoEntry};
use super::validation::expiring_window_end;

/// Totals for one social year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeSummary {
    /// Social year ID.
    pub social_year_id: Uuid,
    /// Members with at least one overdue fee.
    pub morosi_count: u64,
    /// Sum of pending and overdue amounts.
    pub pending_total: Decimal,
    /// Sum of paid amounts.
    pub collected_total: Decimal,
}

impl<S, N, A> FeeLedgerCoordinator<S, N, A>
where
    S: FeeStore,
    N: Notifier,
    A: AuditLog,
{
    /// Number of members with at least one overdue fee in the year.
    pub async fn count_morosi(&self, social_year_id: Uuid) -> Result<u64, FeeError> {
        self.store.count_members_with_overdue(social_year_id).await
    }

    /// Amount still owed in the year: pending plus overdue.
    pub async fn total_pending_fees(&self, social_year_id: Uuid) -> Result<Decimal, FeeError> {
        self.store
            .sum_amounts(social_year_id, &[FeeStatus::Pending, FeeStatus::Overdue])
            .await
    }

    /// Amount collected in the year: paid fees only.
    pub async fn total_collected_fees(&self, social_year_id: Uuid) -> Result<Decimal, FeeError> {
        self.store
            .sum_amounts(social_year_id, &[FeeStatus::Paid])
            .await
    }

    /// Pending fees due between today and `days` from now, inclusive.
    pub async fn fees_expiring_soon(&self, days: u32) -> Result<Vec<Fee>, FeeError> {
        let today = self.clock.today();
        self.store
            .pending_due_between(today, expiring_window_end(today, days))
            .await
    }

    /// Members with overdue fees in the year.
    pub async fn morosi(&self, social_year_id: Uuid) -> Result<Vec<MorosoEntry>, FeeError> {
        self.store.morosi(social_year_id).await
    }

    /// Counts and totals for the year.
    pub async fn summary(&self, social_year_id: Uuid) -> Result<FeeSummary, FeeError> {
        Ok(FeeSummary {
            social_year_id,
            morosi_count: self.count_morosi(social_year_id).await?,
            pending_total: self.total_pending_fees(social_year_id).await?,
            collected_total: self.total_collected_fees(social_year_id).await?,
        })
    }
}
