//! Side-effect plan for a status change.

use super::types::FeeStatus;

/// What a status change must do besides writing the fee row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Field update only.
    Plain,
    /// Unpaid to paid: allocate the receipt and create the income movement.
    Pay,
    /// Paid to unpaid: delete the movement and the receipt, clear payment fields.
    Reopen,
}

/// Plans the transition from `current` to `target`.
#[must_use]
pub const fn plan(current: FeeStatus, target: FeeStatus) -> TransitionPlan {
    match (current, target) {
        (FeeStatus::Paid, FeeStatus::Paid) => TransitionPlan::Plain,
        (_, FeeStatus::Paid) => TransitionPlan::Pay,
        (FeeStatus::Paid, _) => TransitionPlan::Reopen,
        _ => TransitionPlan::Plain,
    }
}

/// Status the overdue sweep assigns, if it changes anything.
#[must_use]
pub fn swept_status(
    status: FeeStatus,
    due_date: chrono::NaiveDate,
    today: chrono::NaiveDate,
) -> Option<FeeStatus> {
    (status == FeeStatus::Pending && due_date < today).then_some(FeeStatus::Overdue)
}
