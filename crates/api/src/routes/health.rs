//! Health check endpoint.
//!
//! Reports whether the tenant schema can be reached. Public, no token.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use sodalis_db::TenantConnection;
use tracing::warn;

use crate::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Schema requests run against.
    pub tenant_schema: String,
    /// `reachable` or `unreachable`.
    pub database: &'static str,
}

/// GET `/health` - Service and tenant database status.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let reachable = match TenantConnection::ping(&state.db, &state.tenant_schema).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                schema = %state.tenant_schema,
                error = %e,
                "Health check cannot reach tenant schema"
            );
            false
        }
    };

    let (code, status, database) = if reachable {
        (StatusCode::OK, "healthy", "reachable")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            tenant_schema: state.tenant_schema.to_string(),
            database,
        }),
    )
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
