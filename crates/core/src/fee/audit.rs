//! Audit trail seam.
//!
//! Entries are written after the fee transaction commits. A failed write is
//! logged and never undoes the financial change.

use std::future::Future;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use super::types::Fee;

/// Kind of change recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// Entity created.
    Create,
    /// Entity changed.
    Update,
    /// Entity removed.
    Delete,
}

impl AuditAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    /// What happened.
    pub action: AuditAction,
    /// Logical entity name, e.g. `fee`.
    pub entity_type: &'static str,
    /// Entity ID.
    pub entity_id: Uuid,
    /// Short human label.
    pub label: String,
    /// Values before the change.
    pub old_values: Option<Value>,
    /// Values after the change.
    pub new_values: Option<Value>,
    /// User who made the change.
    pub actor_id: Uuid,
}

/// Audit write failure.
#[derive(Debug, Error)]
#[error("audit write failed: {0}")]
pub struct AuditError(pub String);

/// Persists audit entries.
pub trait AuditLog: Send + Sync {
    /// Records one entry.
    fn record(&self, entry: AuditEntry) -> impl Future<Output = Result<(), AuditError>> + Send;
}

/// Fields of a fee captured in audit snapshots.
#[must_use]
pub fn fee_snapshot(fee: &Fee) -> Value {
    json!({
        "member_id": fee.member_id,
        "social_year_id": fee.social_year_id,
        "fee_type": fee.fee_type,
        "amount": fee.amount,
        "due_date": fee.due_date,
        "status": fee.status,
        "paid_date": fee.paid_date,
        "payment_method": fee.payment_method,
        "receipt_number": fee.receipt_number,
        "payment_pending": fee.payment_pending,
        "payment_reference": fee.payment_reference,
    })
}

impl AuditEntry {
    /// Entry for a created fee.
    #[must_use]
    pub fn fee_created(actor_id: Uuid, fee: &Fee) -> Self {
        Self {
            action: AuditAction::Create,
            entity_type: "fee",
            entity_id: fee.id,
            label: fee.audit_label(),
            old_values: None,
            new_values: Some(fee_snapshot(fee)),
            actor_id,
        }
    }

    /// Entry for a changed fee.
    #[must_use]
    pub fn fee_updated(actor_id: Uuid, old: &Fee, new: &Fee) -> Self {
        Self {
            action: AuditAction::Update,
            entity_type: "fee",
            entity_id: new.id,
            label: new.audit_label(),
            old_values: Some(fee_snapshot(old)),
            new_values: Some(fee_snapshot(new)),
            actor_id,
        }
    }

    /// Entry for a deleted fee.
    #[must_use]
    pub fn fee_deleted(actor_id: Uuid, fee: &Fee) -> Self {
        Self {
            action: AuditAction::Delete,
            entity_type: "fee",
            entity_id: fee.id,
            label: fee.audit_label(),
            old_values: Some(fee_snapshot(fee)),
            new_values: None,
            actor_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::types::FeeStatus;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn fee(status: FeeStatus) -> Fee {
        Fee {
            id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            social_year_id: Uuid::new_v4(),
            fee_type: "Quota".into(),
            amount: dec!(50.00),
            due_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            paid_date: None,
            payment_method: None,
            receipt_number: None,
            status,
            payment_pending: false,
            payment_reference: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_update_entry_captures_status_change() {
        let old = fee(FeeStatus::Pending);
        let mut new = old.clone();
        new.status = FeeStatus::Paid;

        let entry = AuditEntry::fee_updated(Uuid::nil(), &old, &new);
        assert_eq!(entry.action.as_str(), "update");
        assert_eq!(entry.entity_type, "fee");
        assert_eq!(entry.old_values.unwrap()["status"], "pending");
        assert_eq!(entry.new_values.unwrap()["status"], "paid");
    }

    #[test]
    fn test_snapshot_amount_is_string() {
        let snapshot = fee_snapshot(&fee(FeeStatus::Pending));
        assert_eq!(snapshot["amount"], "50.00");
    }

    #[test]
    fn test_delete_entry_has_no_new_values() {
        let entry = AuditEntry::fee_deleted(Uuid::nil(), &fee(FeeStatus::Paid));
        assert_eq!(entry.action, AuditAction::Delete);
        assert!(entry.new_values.is_none());
        assert!(entry.old_values.is_some());
    }
}
