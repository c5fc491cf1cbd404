//! Member registry routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use sodalis_core::fee::Member;
use sodalis_db::repositories::CreateMemberInput;
use sodalis_shared::types::{PageRequest, PageResponse};
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the member routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/members", get(list_members).post(create_member))
        .route("/members/{member_id}", get(get_member))
}

/// Request body for registering a member.
#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Contact address.
    pub email: Option<String>,
}

/// GET `/members` - List members by name.
async fn list_members(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<Member>>, ApiError> {
    Ok(Json(state.members.list(&page).await?))
}

/// POST `/members` - Register a member.
async fn create_member(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<CreateMemberRequest>,
) -> Result<(StatusCode, Json<Member>), ApiError> {
    let member = state
        .members
        .create(CreateMemberInput {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// GET `/members/{member_id}` - Member by ID.
async fn get_member(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(member_id): Path<Uuid>,
) -> Result<Json<Member>, ApiError> {
    state
        .members
        .find_by_id(member_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("member {member_id}")))
}
