use axum::{http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Machine-readable error body returned inside the error envelope
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Field-level validation detail
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Uniform error envelope for all API responses
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code: code.to_string(),
                message: message.into(),
                details: None,
            },
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(code: &str, message: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code: code.to_string(),
                message: message.into(),
                details: Some(details),
            },
            timestamp: Utc::now(),
        }
    }
}

/// Build the `(status, envelope)` pair handlers return on failure
pub fn api_error(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse::new(code, message)))
}

pub fn validation_error(details: Vec<FieldError>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::with_details(
            "VALIDATION_ERROR",
            "Request payload is invalid",
            details,
        )),
    )
}

// Stable error codes surfaced to clients
pub const AUTH_TOKEN_MISSING: &str = "AUTH_TOKEN_MISSING";
pub const AUTH_TOKEN_INVALID: &str = "AUTH_TOKEN_INVALID";
pub const CURRICULUM_NOT_FOUND: &str = "CURRICULUM_NOT_FOUND";
pub const VERSION_NOT_FOUND: &str = "VERSION_NOT_FOUND";
pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
