//! Fee reporting routes.
//!
//! Summary and morosi run the overdue sweep first; the reporting queries
//! themselves never write.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use sodalis_core::fee::{Fee, FeeSummary, MorosoEntry};
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Default horizon for the expiring-soon report.
const DEFAULT_EXPIRING_DAYS: u32 = 30;
/// Longest horizon accepted for the expiring-soon report.
const MAX_EXPIRING_DAYS: u32 = 366;

/// Creates the report routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/social-years/{social_year_id}/summary", get(summary))
        .route("/reports/social-years/{social_year_id}/morosi", get(morosi))
        .route("/reports/expiring", get(expiring))
}

/// Query parameters for the expiring-soon report.
#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    /// Days ahead of today to include.
    pub days: Option<u32>,
}

async fn require_social_year(state: &AppState, social_year_id: Uuid) -> Result<(), ApiError> {
    state
        .social_years
        .find_by_id(social_year_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found(format!("social year {social_year_id}")))
}

/// GET `/reports/social-years/{id}/summary` - Morosi count and totals.
async fn summary(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(social_year_id): Path<Uuid>,
) -> Result<Json<FeeSummary>, ApiError> {
    require_social_year(&state, social_year_id).await?;
    state.fees.update_overdue_statuses().await?;
    Ok(Json(state.fees.summary(social_year_id).await?))
}

/// GET `/reports/social-years/{id}/morosi` - Members with overdue fees.
async fn morosi(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(social_year_id): Path<Uuid>,
) -> Result<Json<Vec<MorosoEntry>>, ApiError> {
    require_social_year(&state, social_year_id).await?;
    state.fees.update_overdue_statuses().await?;
    Ok(Json(state.fees.morosi(social_year_id).await?))
}

/// GET `/reports/expiring?days=` - Pending fees falling due soon.
async fn expiring(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ExpiringQuery>,
) -> Result<Json<Vec<Fee>>, ApiError> {
    let days = query
        .days
        .unwrap_or(DEFAULT_EXPIRING_DAYS)
        .min(MAX_EXPIRING_DAYS);
    Ok(Json(state.fees.fees_expiring_soon(days).await?))
}
