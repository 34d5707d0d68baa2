use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced by `/predict`. Every variant renders as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Please send a sentence with the 'sentence' key.")]
    BadRequest,

    #[error("Model is not loaded, please check the server logs.")]
    ModelUnavailable,

    #[error("Failed to analyze the sentence.")]
    AnalyzerFailure,

    #[error("Analysis timed out.")]
    Timeout,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::ModelUnavailable | Self::AnalyzerFailure => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
