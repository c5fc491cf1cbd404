//! Social year routes.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::NaiveDate;
use serde::Deserialize;
use sodalis_core::fee::SocialYear;
use sodalis_db::repositories::CreateSocialYearInput;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the social year routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/social-years", get(list_social_years).post(create_social_year))
        .route("/social-years/current", get(current_social_year))
}

/// Request body for opening a social year.
#[derive(Debug, Deserialize)]
pub struct CreateSocialYearRequest {
    /// Display name, e.g. "2024/2025".
    #[serde(default)]
    pub name: String,
    /// First day (YYYY-MM-DD).
    pub start_date: NaiveDate,
    /// Last day (YYYY-MM-DD).
    pub end_date: NaiveDate,
    /// Make this the current year.
    #[serde(default)]
    pub is_current: bool,
}

/// GET `/social-years` - Every social year, most recent first.
async fn list_social_years(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<SocialYear>>, ApiError> {
    Ok(Json(state.social_years.list().await?))
}

/// POST `/social-years` - Open a social year.
async fn create_social_year(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<CreateSocialYearRequest>,
) -> Result<(StatusCode, Json<SocialYear>), ApiError> {
    let year = state
        .social_years
        .create(CreateSocialYearInput {
            name: payload.name,
            start_date: payload.start_date,
            end_date: payload.end_date,
            is_current: payload.is_current,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(year)))
}

/// GET `/social-years/current` - The year new fees default to.
async fn current_social_year(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<SocialYear>, ApiError> {
    state
        .social_years
        .find_current()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("current social year"))
}
