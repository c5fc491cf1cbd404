//! Roles and the acting identity passed into every mutating operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fee::FeeError;

/// User roles within the association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full access, including deletion and offline payment review.
    Admin,
    /// Day-to-day fee management.
    Operator,
}

impl UserRole {
    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "operator" => Some(Self::Operator),
            _ => None,
        }
    }

    /// Returns true if this role can delete fees.
    #[must_use]
    pub const fn can_delete(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Returns true if this role can confirm or reject declared payments.
    #[must_use]
    pub const fn can_review_payments(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// User ID, recorded on receipts and audit entries.
    pub user_id: Uuid,
    /// Role used for permission checks.
    pub role: UserRole,
}

impl Actor {
    /// Creates a new actor.
    #[must_use]
    pub const fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// Fails with `FeeError::Forbidden` unless the actor is an admin.
    pub fn require_admin(&self, operation: &'static str) -> Result<(), FeeError> {
        if self.role == UserRole::Admin {
            Ok(())
        } else {
            Err(FeeError::Forbidden {
                operation,
                role: self.role,
            })
        }
    }
}
