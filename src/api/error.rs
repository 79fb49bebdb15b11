use axum::{
    extract::rejection::QueryRejection,
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::types::errors::{AcquisitionError, RefreshError, SchemaError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Refresh rate limit reached, try again later")]
    RateLimited,
    #[error("Failed to fetch market listing: {0}")]
    Acquisition(#[from] AcquisitionError),
    #[error("Market listing does not match the column config: {0}")]
    Schema(#[from] SchemaError),
    #[error("Failed to refresh market listing: {0}")]
    Upstream(String),
    #[error("Export failed: {0}")]
    Export(#[from] csv::Error),
}

impl From<RefreshError> for ApiError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Acquisition(e) => ApiError::Acquisition(e),
            RefreshError::Schema(e) => ApiError::Schema(e),
            RefreshError::Concurrent(msg) => ApiError::Upstream(msg),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Acquisition(_) | ApiError::Schema(_) | ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
