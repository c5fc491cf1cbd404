//! Fee error types.

use sodalis_shared::{AppError, FieldViolation};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::UserRole;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name as it appears in the request.
    pub field: &'static str,
    /// Machine-readable reason.
    pub code: &'static str,
    /// Human-readable explanation.
    pub message: String,
}

impl FieldError {
    /// Creates a field error.
    pub fn new(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            code,
            message: message.into(),
        }
    }
}

/// Errors that can occur during fee operations.
#[derive(Debug, Error)]
pub enum FeeError {
    /// One or more input fields were rejected. Never partially written.
    #[error("Validation failed on {} field(s): {}", .0.len(), join_fields(.0))]
    Validation(Vec<FieldError>),

    /// Fee not found.
    #[error("Fee {0} not found")]
    FeeNotFound(Uuid),

    /// Social year not found outside of input validation.
    #[error("Social year {0} not found")]
    SocialYearNotFound(Uuid),

    /// Member not found outside of input validation.
    #[error("Member {0} not found")]
    MemberNotFound(Uuid),

    /// The actor's role does not permit the operation.
    #[error("Role {role} may not {operation}")]
    Forbidden {
        /// Operation attempted.
        operation: &'static str,
        /// Role of the actor.
        role: UserRole,
    },

    /// Confirm or reject was called on a fee with no declared payment.
    #[error("Fee {0} has no declared payment awaiting review")]
    NoDeclaredPayment(Uuid),

    /// The operation requires an unpaid fee.
    #[error("Fee {0} is already paid")]
    AlreadyPaid(Uuid),

    /// The store rejected or aborted the unit of work; nothing was applied.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.field)
        .collect::<Vec<_>>()
        .join(", ")
}

impl FeeError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Forbidden { .. } => 403,
            Self::FeeNotFound(_) | Self::SocialYearNotFound(_) | Self::MemberNotFound(_) => 404,
            Self::NoDeclaredPayment(_) | Self::AlreadyPaid(_) => 409,
            Self::Persistence(_) => 500,
            Self::Unavailable(_) => 503,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::FeeNotFound(_) => "FEE_NOT_FOUND",
            Self::SocialYearNotFound(_) => "SOCIAL_YEAR_NOT_FOUND",
            Self::MemberNotFound(_) => "MEMBER_NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::NoDeclaredPayment(_) => "NO_DECLARED_PAYMENT",
            Self::AlreadyPaid(_) => "FEE_ALREADY_PAID",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl From<FeeError> for AppError {
    fn from(err: FeeError) -> Self {
        let message = err.to_string();
        match err {
            FeeError::Validation(fields) => Self::Validation {
                message,
                fields: fields
                    .into_iter()
                    .map(|f| FieldViolation {
                        field: f.field.to_string(),
                        code: f.code.to_string(),
                        message: f.message,
                    })
                    .collect(),
            },
            FeeError::FeeNotFound(_)
            | FeeError::SocialYearNotFound(_)
            | FeeError::MemberNotFound(_) => Self::NotFound(message),
            FeeError::Forbidden { .. } => Self::Forbidden(message),
            FeeError::NoDeclaredPayment(_) | FeeError::AlreadyPaid(_) => Self::Conflict(message),
            FeeError::Persistence(_) => Self::Persistence(message),
            FeeError::Unavailable(_) => Self::Unavailable(message),
        }
    }
}
