//! HTTP error responses. Every error body is `{"detail": "..."}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub const NO_PAPERS_FOUND: &str = "No papers found for the query.";
pub const NO_INDUSTRY_PAPERS: &str = "No papers with pharmaceutical/biotech affiliations found.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Body(#[from] JsonRejection),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            // Any body that is not a usable JSON object is a validation failure.
            ApiError::Body(
                JsonRejection::JsonSyntaxError(_)
                | JsonRejection::JsonDataError(_)
                | JsonRejection::MissingJsonContentType(_),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Body(rejection) => rejection.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            ApiError::Body(rejection) => rejection.body_text(),
            other => other.to_string(),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
