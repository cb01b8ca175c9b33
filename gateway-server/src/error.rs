use axum::{
    extract::{multipart::MultipartError, rejection::BytesRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_shared::{ErrorBody, ValidationError};
use thiserror::Error;
use tracing::{error, warn};

use crate::llm::UpstreamError;

/// What clients see when an upstream call fails. The cause is only logged.
pub const INTERNAL_ERROR_MESSAGE: &str = "服务器内部错误";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("unreadable request body: {0}")]
    Body(#[from] BytesRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(e) => {
                warn!("Rejected request: {}", e);
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            // 413 when the body limit is hit, 400 for a malformed form.
            ApiError::Multipart(e) => {
                warn!("Rejected request: {}", self);
                (multipart_status(e), self.to_string())
            }
            ApiError::Body(e) => {
                warn!("Rejected request body: {}", e.body_text());
                (e.status(), e.body_text())
            }
            ApiError::Upstream(e) => {
                error!("Upstream request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn multipart_status(err: &MultipartError) -> StatusCode {
    match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    }
}
