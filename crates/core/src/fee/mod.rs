//! Fee lifecycle and ledger consistency.
//!
//! This module implements:
//! - Fee, movement and receipt domain types
//! - Accumulating input validation
//! - Status transition planning
//! - Renewal amount computation
//! - Per-year receipt numbering
//! - The coordinator that keeps fee, movement and receipt consistent
//! - Reporting queries

pub mod amount;
pub mod audit;
pub mod coordinator;
pub mod error;
pub mod notify;
pub mod receipt;
pub mod reports;
pub mod store;
pub mod transition;
pub mod types;
pub mod validation;

#[cfg(test)]
mod coordinator_props;
#[cfg(test)]
mod memory;

pub use amount::renewal_amount;
pub use audit::{AuditAction, AuditEntry, AuditError, AuditLog};
pub use coordinator::FeeLedgerCoordinator;
pub use error::{FeeError, FieldError};
pub use notify::Notifier;
pub use receipt::ReceiptNumber;
pub use reports::FeeSummary;
pub use store::{FeeStore, FeeTransaction};
pub use transition::TransitionPlan;
pub use types::{
    BulkFeeRequest, BulkFeeResult, BulkPreviewLine, Fee, FeeDetail, FeeDraft, FeeFilter,
    FeeStatus, FeeUpdate, LedgerMovement, Member, MorosoEntry, MovementType, PaidFee,
    PaymentInput, PaymentMethod, PaymentOutcome, Receipt, SocialYear,
};
