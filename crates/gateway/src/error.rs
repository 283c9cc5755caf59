use crate::codec::{DecodeError, EncodeError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use inference::InferenceError;
use serde_json::json;
use thiserror::Error;

pub const NO_IMAGE_PROVIDED: &str = "No image provided";
pub const FAILED_TO_DECODE_IMAGE: &str = "Failed to decode image";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(m) | ApiError::Internal(m) => m,
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<DecodeError> for ApiError {
    fn from(e: DecodeError) -> Self {
        tracing::warn!(error = %e, "Rejecting undecodable image");
        ApiError::BadRequest(FAILED_TO_DECODE_IMAGE.to_string())
    }
}

impl From<EncodeError> for ApiError {
    fn from(e: EncodeError) -> Self {
        tracing::error!(error = %e, "Failed to encode processed image");
        ApiError::Internal(e.to_string())
    }
}

impl From<InferenceError> for ApiError {
    fn from(e: InferenceError) -> Self {
        tracing::error!(error = %e, "Detection failed");
        ApiError::Internal(e.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        tracing::error!(error = %e, "Detection task failed (task panicked or cancelled)");
        ApiError::Internal(format!("Detection task failed: {}", e))
    }
}
