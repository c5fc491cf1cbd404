//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use sodalis_core::fee::FeeError;
use sodalis_db::RepositoryError;
use sodalis_shared::AppError;
use tracing::error;

/// Error returned by handlers.
///
/// Rendered as `{ "error": CODE, "message": text, "fields": [...] }`. Fee
/// errors keep their own code, e.g. `FEE_ALREADY_PAID`, rather than the
/// generic one of their HTTP class.
#[derive(Debug)]
pub struct ApiError {
    error: AppError,
    code: &'static str,
}

impl ApiError {
    /// Shorthand for a 404.
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into()).into()
    }

    /// The machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        let code = error.error_code();
        Self { error, code }
    }
}

impl From<FeeError> for ApiError {
    fn from(err: FeeError) -> Self {
        let code = err.error_code();
        Self {
            error: err.into(),
            code,
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        AppError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.error, code = self.code, "Request failed");
        }

        let body = json!({
            "error": self.code,
            "message": self.error.to_string(),
            "fields": self.error.fields(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use sodalis_core::fee::FieldError;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_fee_not_found_renders_404() {
        let response = ApiError::from(FeeError::FeeNotFound(Uuid::nil())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"], "FEE_NOT_FOUND");
        assert_eq!(body["fields"], json!([]));
    }

    #[tokio::test]
    async fn test_validation_lists_fields() {
        let err = FeeError::Validation(vec![
            FieldError::new("amount", "not_positive", "amount must be positive"),
            FieldError::new("due_date", "required", "due date is required"),
        ]);
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["fields"].as_array().unwrap().len(), 2);
        assert_eq!(body["fields"][0]["field"], "amount");
    }

    #[tokio::test]
    async fn test_plain_not_found_uses_generic_code() {
        let response = ApiError::not_found("member").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_unavailable_renders_503() {
        let response = ApiError::from(FeeError::Unavailable("down".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
