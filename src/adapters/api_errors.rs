use crate::domain::error::PipelineError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Newtype so the domain error can become an HTTP response.
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self.0 {
            PipelineError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", Some(msg.clone()))
            }
            PipelineError::WebhookSignature(_) => (
                StatusCode::BAD_REQUEST,
                "webhook_error",
                Some("invalid webhook signature".to_string()),
            ),
            PipelineError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            PipelineError::Provider(msg) => {
                tracing::error!("gateway error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "gateway_error",
                    Some(msg.clone()),
                )
            }
            PipelineError::Http(err) => {
                tracing::error!("gateway transport error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "gateway_error",
                    Some(err.to_string()),
                )
            }
            PipelineError::Timeout(budget) => {
                tracing::error!("gateway timed out after {budget:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "gateway_timeout",
                    Some(format!("no answer within {}s", budget.as_secs())),
                )
            }
            PipelineError::Database(err) => {
                tracing::error!("database error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            PipelineError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorBody {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
