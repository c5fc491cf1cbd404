//! Audit log persistence.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use sodalis_core::fee::{AuditEntry, AuditError, AuditLog};
use uuid::Uuid;

use crate::entities::audit_log;
use crate::tenant::TenantConnection;

/// Writes audit entries in their own transaction.
#[derive(Debug, Clone)]
pub struct DbAuditLog {
    db: DatabaseConnection,
    schema: String,
}

impl DbAuditLog {
    /// Creates a new audit log for the given tenant schema.
    #[must_use]
    pub const fn new(db: DatabaseConnection, schema: String) -> Self {
        Self { db, schema }
    }
}

impl AuditLog for DbAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let conn = TenantConnection::begin(&self.db, &self.schema)
            .await
            .map_err(|e| AuditError(e.to_string()))?;

        audit_log::ActiveModel {
            id: Set(Uuid::now_v7()),
            action: Set(entry.action.as_str().to_string()),
            entity_type: Set(entry.entity_type.to_string()),
            entity_id: Set(entry.entity_id),
            label: Set(entry.label),
            old_values: Set(entry.old_values),
            new_values: Set(entry.new_values),
            actor_id: Set(entry.actor_id),
            created_at: Set(Utc::now().into()),
        }
        .insert(conn.transaction())
        .await
        .map_err(|e| AuditError(e.to_string()))?;

        conn.commit().await.map_err(|e| AuditError(e.to_string()))
    }
}
