//! Ledger movement routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use sodalis_core::fee::LedgerMovement;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the movement routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/movements", get(list_movements))
}

/// Query parameters for listing movements.
#[derive(Debug, Deserialize)]
pub struct ListMovementsQuery {
    /// Restrict to one social year.
    pub social_year_id: Option<Uuid>,
}

/// GET `/movements` - Ledger movements, newest first.
async fn list_movements(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListMovementsQuery>,
) -> Result<Json<Vec<LedgerMovement>>, ApiError> {
    Ok(Json(state.movements.list(query.social_year_id).await?))
}
