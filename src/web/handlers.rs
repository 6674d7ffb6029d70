use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::analyzer::{AnalyzeOutcome, AnalyzeRequest, NO_SEARCH_TERM_ERROR, QUERY_REQUIRED_ERROR};
use crate::models::SearchReport;
use super::{ApiError, AppState, HealthResponse, RecognitionFailure};

#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 500, message = "Search query required"))]
    pub query: String,
}

fn validation_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}

fn reject_body(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge(rejection.body_text());
    }
    ApiError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
}

pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(reject_body)?;

    let response = match state.analyzer.analyze(request).await? {
        AnalyzeOutcome::Complete(report) => Json(report).into_response(),
        AnalyzeOutcome::RecognitionFailed(result) => {
            tracing::warn!(error = ?result.error, "Returning recognition failure");
            Json(RecognitionFailure::failed(result)).into_response()
        }
        AnalyzeOutcome::NoSearchTerm(result) => {
            Json(RecognitionFailure::no_search_term(NO_SEARCH_TERM_ERROR, result)).into_response()
        }
    };

    Ok(response)
}

pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchReport>, ApiError> {
    let Json(request) = payload.map_err(reject_body)?;

    if request.query.trim().is_empty() {
        return Err(ApiError::bad_request(QUERY_REQUIRED_ERROR));
    }
    request
        .validate()
        .map_err(|e| ApiError::bad_request(validation_message(&e)))?;

    let report = state.analyzer.search(&request.query).await?;
    Ok(Json(report))
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
