//! Per-tenant schema selection.
//!
//! Every association lives in its own PostgreSQL schema. Entities only name
//! logical tables, so each unit of work sets `search_path` with `SET LOCAL`
//! before its first query; the setting ends with the transaction.
//!
//! # Usage
//!
//! ```ignore
//! use sodalis_db::tenant::TenantConnection;
//!
//! let conn = TenantConnection::begin(&db, "assoc_rome").await?;
//! let members = members::Entity::find().all(conn.transaction()).await?;
//! conn.commit().await?;
//! ```

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use thiserror::Error;

/// Errors raised while opening a tenant transaction.
#[derive(Debug, Error)]
pub enum TenantError {
    /// Schema name contains characters outside `[a-z0-9_]`.
    #[error("Invalid tenant schema name: {0:?}")]
    InvalidSchema(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// A transaction whose `search_path` points at one tenant schema.
pub struct TenantConnection {
    txn: DatabaseTransaction,
}

impl TenantConnection {
    /// Begins a transaction and scopes it to `schema`.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema name is not a plain identifier, the
    /// transaction cannot be started, or `search_path` cannot be set.
    pub async fn begin(db: &DatabaseConnection, schema: &str) -> Result<Self, TenantError> {
        let sql = search_path_sql(schema)?;
        let txn = db.begin().await?;
        txn.execute_unprepared(&sql).await?;
        Ok(Self { txn })
    }

    /// Opens and commits an empty tenant transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema name is invalid or the database
    /// cannot be reached.
    pub async fn ping(db: &DatabaseConnection, schema: &str) -> Result<(), TenantError> {
        let conn = Self::begin(db, schema).await?;
        conn.txn.execute_unprepared("SELECT 1").await?;
        conn.commit().await?;
        Ok(())
    }

    /// Returns the underlying transaction for executing queries.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits the transaction, persisting all changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }

    /// Rolls back the transaction, discarding all changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}

/// Returns true if `schema` can be interpolated into `SET LOCAL search_path`.
#[must_use]
pub fn is_valid_schema(schema: &str) -> bool {
    !schema.is_empty()
        && schema.len() <= 63
        && schema
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        && !schema.as_bytes()[0].is_ascii_digit()
}

/// Builds the `SET LOCAL search_path` statement for a tenant schema.
///
/// `SET` does not accept bind parameters, so the name is validated and quoted.
pub fn search_path_sql(schema: &str) -> Result<String, TenantError> {
    if !is_valid_schema(schema) {
        return Err(TenantError::InvalidSchema(schema.to_string()));
    }
    Ok(format!("SET LOCAL search_path TO \"{schema}\""))
}
