//! Repository implementations over tenant schemas.

pub mod audit;
pub mod fee;
pub mod member;
pub mod movement;
pub mod social_year;

pub use audit::DbAuditLog;
pub use fee::{PgFeeStore, PgFeeTx};
pub use member::{CreateMemberInput, MemberRepository};
pub use movement::MovementRepository;
pub use social_year::{CreateSocialYearInput, SocialYearRepository};

use sea_orm::DbErr;
use sodalis_shared::{AppError, FieldViolation};
use thiserror::Error;

use crate::tenant::TenantError;

/// Error types for registry and ledger repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Input rejected before touching the database.
    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldViolation>),

    /// Tenant transaction could not be opened.
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

fn join_fields(fields: &[FieldViolation]) -> String {
    fields
        .iter()
        .map(|f| f.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn violation(field: &str, code: &str, message: &str) -> FieldViolation {
    FieldViolation {
        field: field.to_string(),
        code: code.to_string(),
        message: message.to_string(),
    }
}

fn database_app_error(err: &DbErr) -> AppError {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => AppError::Unavailable(err.to_string()),
        _ => AppError::Persistence(err.to_string()),
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Validation(fields) => Self::Validation {
                message: format!("{} field(s) rejected", fields.len()),
                fields,
            },
            RepositoryError::Tenant(TenantError::Database(db)) | RepositoryError::Database(db) => {
                database_app_error(&db)
            }
            RepositoryError::Tenant(other) => Self::Internal(other.to_string()),
        }
    }
}
