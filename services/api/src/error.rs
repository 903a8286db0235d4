//! Custom error types for the API service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::StoreError;
use serde_json::json;
use std::sync::OnceLock;
use thiserror::Error;

static PRODUCTION_MODE: OnceLock<bool> = OnceLock::new();

/// Record whether the process runs in production; wired from
/// `AppConfig` at startup. First write wins; while unset, responses
/// behave as if in production so internals are never leaked by
/// default.
pub fn set_production_mode(production: bool) {
    let _ = PRODUCTION_MODE.set(production);
}

fn production_mode() -> bool {
    *PRODUCTION_MODE.get().unwrap_or(&true)
}

/// Domain error carried by every failing operation. One terminal
/// handler (`IntoResponse`) renders it; outside production the response
/// additionally echoes the error detail.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed input, expired/invalid reset token, failed validation
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials or session
    #[error("{0}")]
    Unauthorized(String),

    /// Role mismatch on a protected route
    #[error("{0}")]
    Forbidden(String),

    /// Missing resource or user
    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique field
    #[error("{0}")]
    Conflict(String),

    /// Downstream dependency failure
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("document not found".to_string()),
            StoreError::Conflict(field) => {
                ApiError::Conflict(format!("duplicate value for {field}"))
            }
            StoreError::Backend(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let label = if status.is_server_error() { "error" } else { "fail" };

        let mut body = json!({
            "status": label,
            "message": self.to_string(),
        });

        // Production responses never leak internals.
        if !production_mode() {
            if let ApiError::Internal(source) = &self {
                body["detail"] = json!(format!("{source:#}"));
            }
        }

        if status.is_server_error() {
            tracing::error!("request failed: {self:?}");
        }

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
