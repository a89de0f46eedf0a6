use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
    pub status: u16,
}

/// Map domain errors to HTTP responses. Internal detail is logged, not leaked.
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let error_type = match err {
        AppError::BadRequest(_) => "validation_error",
        AppError::Unauthorized => "authentication_error",
        AppError::Forbidden => "authorization_error",
        AppError::NotFound => "not_found_error",
        AppError::Database(_) => "persistence_error",
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => "server_error",
    };

    let message = match err {
        AppError::Database(e) => {
            tracing::error!(error=%e, "database error");
            "persistence failure".to_string()
        }
        other => other.to_string(),
    };

    (
        status,
        ErrorResponse {
            success: false,
            error: error_type,
            message,
            status: status.as_u16(),
        },
    )
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    let (status, body) = map_error(&err);
    (status, Json(body))
}
