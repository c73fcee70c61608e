use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::error::PipelineError,
        services::codes::{CodeCheck, issue_code, verify_code},
    },
    axum::{
        Json,
        extract::{State, rejection::JsonRejection},
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    chrono::Utc,
    serde::Deserialize,
    serde_json::json,
};

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub codigo: String,
}

pub async fn send_code_handler(
    State(state): State<AppState>,
    body: Result<Json<SendCodeRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) = body.map_err(|e| PipelineError::Validation(e.body_text()))?;
    issue_code(&*state.codes, &*state.emails, &request.email, Utc::now()).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn verify_code_handler(
    State(state): State<AppState>,
    body: Result<Json<VerifyCodeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| PipelineError::Validation(e.body_text()))?;
    let check = verify_code(&*state.codes, &request.email, &request.codigo, Utc::now()).await?;

    let response = match check {
        CodeCheck::Valid => (StatusCode::OK, Json(json!({ "valid": true }))),
        CodeCheck::Mismatch => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_code", "details": "code does not match" })),
        ),
        CodeCheck::Expired => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "code_expired", "details": "request a new code" })),
        ),
        CodeCheck::Missing => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "not_found", "details": "no code for this email" })),
        ),
    };
    Ok(response.into_response())
}
