//! Fee routes.
//!
//! Listing runs the overdue sweep first so statuses reflect today's date.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sodalis_core::fee::{
    BulkFeeRequest, BulkFeeResult, BulkPreviewLine, Fee, FeeDetail, FeeDraft, FeeFilter,
    FeeStatus, FeeUpdate, PaymentInput, PaymentOutcome, Receipt,
};
use sodalis_shared::types::{PageRequest, PageResponse};
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the fee routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/fees", get(list_fees).post(create_fee))
        .route("/fees/bulk", post(bulk_create))
        .route("/fees/bulk/preview", post(bulk_preview))
        .route("/fees/overdue/refresh", post(refresh_overdue))
        .route("/fees/{fee_id}", get(get_fee).put(update_fee).delete(delete_fee))
        .route("/fees/{fee_id}/pay", post(pay_fee))
        .route("/fees/{fee_id}/declare-payment", post(declare_payment))
        .route("/fees/{fee_id}/confirm-payment", post(confirm_payment))
        .route("/fees/{fee_id}/reject-payment", post(reject_payment))
        .route("/fees/{fee_id}/receipt", get(get_receipt))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing fees.
#[derive(Debug, Deserialize)]
pub struct ListFeesQuery {
    /// Filter by social year.
    pub social_year_id: Option<Uuid>,
    /// Filter by member.
    pub member_id: Option<Uuid>,
    /// Filter by status.
    pub status: Option<FeeStatus>,
    /// Filter by declared-payment flag.
    pub payment_pending: Option<bool>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

impl ListFeesQuery {
    fn split(self) -> (FeeFilter, PageRequest) {
        let defaults = PageRequest::default();
        (
            FeeFilter {
                social_year_id: self.social_year_id,
                member_id: self.member_id,
                status: self.status,
                payment_pending: self.payment_pending,
            },
            PageRequest {
                page: self.page.unwrap_or(defaults.page),
                per_page: self.per_page.unwrap_or(defaults.per_page),
            },
        )
    }
}

/// Request body for creating a fee.
#[derive(Debug, Deserialize)]
pub struct CreateFeeRequest {
    /// Owing member.
    pub member_id: Option<Uuid>,
    /// Social year.
    pub social_year_id: Option<Uuid>,
    /// Free-text category.
    #[serde(default)]
    pub fee_type: String,
    /// Amount due.
    pub amount: Option<Decimal>,
    /// Due date (YYYY-MM-DD).
    pub due_date: Option<NaiveDate>,
    /// Free notes.
    pub notes: Option<String>,
    /// Email the member about the new fee.
    #[serde(default)]
    pub notify: bool,
}

/// Request body for declaring a bank transfer.
#[derive(Debug, Deserialize)]
pub struct DeclarePaymentRequest {
    /// Transfer reference given by the member.
    #[serde(default)]
    pub reference: String,
}

/// Response for the overdue sweep.
#[derive(Debug, Serialize)]
pub struct OverdueRefreshResponse {
    /// Fees moved from pending to overdue.
    pub updated: u64,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/fees` - List fees.
async fn list_fees(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListFeesQuery>,
) -> Result<Json<PageResponse<Fee>>, ApiError> {
    state.fees.update_overdue_statuses().await?;
    let (filter, page) = query.split();
    Ok(Json(state.fees.list_fees(&filter, &page).await?))
}

/// POST `/fees` - Create a pending fee.
async fn create_fee(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateFeeRequest>,
) -> Result<(StatusCode, Json<Fee>), ApiError> {
    let draft = FeeDraft {
        member_id: payload.member_id,
        social_year_id: payload.social_year_id,
        fee_type: payload.fee_type,
        amount: payload.amount,
        due_date: payload.due_date,
        notes: payload.notes,
    };
    let fee = state
        .fees
        .create_fee(auth.actor(), draft, payload.notify)
        .await?;
    Ok((StatusCode::CREATED, Json(fee)))
}

/// GET `/fees/{fee_id}` - Fee with its receipt and movements.
async fn get_fee(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(fee_id): Path<Uuid>,
) -> Result<Json<FeeDetail>, ApiError> {
    Ok(Json(state.fees.get_fee(fee_id).await?))
}

/// PUT `/fees/{fee_id}` - Apply the edit form.
async fn update_fee(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(fee_id): Path<Uuid>,
    Json(payload): Json<FeeUpdate>,
) -> Result<Json<Fee>, ApiError> {
    Ok(Json(
        state.fees.set_status(auth.actor(), fee_id, payload).await?,
    ))
}

/// DELETE `/fees/{fee_id}` - Delete a fee. Admin only.
async fn delete_fee(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(fee_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.fees.delete_fee(auth.actor(), fee_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/fees/{fee_id}/pay` - Mark a fee paid.
async fn pay_fee(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(fee_id): Path<Uuid>,
    Json(payload): Json<PaymentInput>,
) -> Result<Json<PaymentOutcome>, ApiError> {
    Ok(Json(
        state.fees.mark_paid(auth.actor(), fee_id, payload).await?,
    ))
}

/// POST `/fees/{fee_id}/declare-payment` - Record a declared bank transfer.
async fn declare_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(fee_id): Path<Uuid>,
    Json(payload): Json<DeclarePaymentRequest>,
) -> Result<Json<Fee>, ApiError> {
    let fee = state
        .fees
        .declare_offline_payment(auth.actor(), fee_id, &payload.reference)
        .await?;
    Ok(Json(fee))
}

/// POST `/fees/{fee_id}/confirm-payment` - Confirm a declared transfer. Admin only.
async fn confirm_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(fee_id): Path<Uuid>,
) -> Result<Json<PaymentOutcome>, ApiError> {
    Ok(Json(
        state
            .fees
            .confirm_offline_payment(auth.actor(), fee_id)
            .await?,
    ))
}

/// POST `/fees/{fee_id}/reject-payment` - Reject a declared transfer. Admin only.
async fn reject_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(fee_id): Path<Uuid>,
) -> Result<Json<Fee>, ApiError> {
    Ok(Json(
        state.fees.reject_offline_payment(auth.actor(), fee_id).await?,
    ))
}

/// GET `/fees/{fee_id}/receipt` - Receipt of a paid fee.
async fn get_receipt(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(fee_id): Path<Uuid>,
) -> Result<Json<Receipt>, ApiError> {
    state
        .fees
        .get_receipt(fee_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("receipt for fee {fee_id}")))
}

/// POST `/fees/bulk/preview` - Compute a bulk renewal without writing.
async fn bulk_preview(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(payload): Json<BulkFeeRequest>,
) -> Result<Json<Vec<BulkPreviewLine>>, ApiError> {
    Ok(Json(state.fees.preview_bulk(&payload).await?))
}

/// POST `/fees/bulk` - Create renewal fees for many members.
async fn bulk_create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<BulkFeeRequest>,
) -> Result<(StatusCode, Json<BulkFeeResult>), ApiError> {
    let result = state.fees.bulk_create_fees(auth.actor(), payload).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// POST `/fees/overdue/refresh` - Run the overdue sweep.
async fn refresh_overdue(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<OverdueRefreshResponse>, ApiError> {
    let updated = state.fees.update_overdue_statuses().await?;
    Ok(Json(OverdueRefreshResponse { updated }))
}
