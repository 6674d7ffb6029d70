use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::RecognitionResult;
use crate::utils::error::AppError;

pub const WARMUP_SUGGESTION: &str =
    "The AI models may be loading (first time takes 30-60 seconds). Please try again or use manual search.";

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

// Error type returned by handlers
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    PayloadTooLarge(String),
    InternalServerError { message: String, debug: Option<String> },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) | ApiError::PayloadTooLarge(msg) => msg.clone(),
            ApiError::InternalServerError { message, .. } => message.clone(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        let debug = match self {
            ApiError::InternalServerError { debug, .. } => debug.clone(),
            _ => None,
        };
        ErrorBody {
            error: self.message(),
            code: self.error_code().to_string(),
            debug,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self.message(), "Request failed");
        }
        (self.status_code(), Json(self.body())).into_response()
    }
}

// Common error constructors
impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal_with_debug(msg: impl Into<String>, debug: impl Into<String>) -> Self {
        Self::InternalServerError {
            message: msg.into(),
            debug: Some(debug.into()),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::internal_with_debug(
                format!("Server error: {}", other),
                format!("{:?}", other),
            ),
        }
    }
}

/// Recognition ran but did not identify anything; still a 200.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecognitionFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub result: RecognitionResult,
}

impl RecognitionFailure {
    pub fn failed(result: RecognitionResult) -> Self {
        Self {
            error: result.error.clone().unwrap_or_default(),
            debug_info: result.debug_info.clone(),
            suggestion: Some(WARMUP_SUGGESTION.to_string()),
            result,
        }
    }

    pub fn no_search_term(error: impl Into<String>, result: RecognitionResult) -> Self {
        Self {
            error: error.into(),
            debug_info: None,
            suggestion: None,
            result,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
        }
    }
}
