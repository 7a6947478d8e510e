use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::CLIPSTORE_STATUS_HEADER;
use crate::encoder::EncodeError;
use crate::engine::MatchError;
use crate::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<MatchError> for GatewayError {
    fn from(err: MatchError) -> Self {
        let message = err.to_string();
        match err {
            MatchError::Repository(RepositoryError::KeyExists { .. }) => {
                GatewayError::Conflict(message)
            }
            MatchError::Repository(RepositoryError::KeyNotFound { .. }) => {
                GatewayError::NotFound(message)
            }
            MatchError::Repository(
                RepositoryError::InvalidKey { .. }
                | RepositoryError::DimensionMismatch { .. }
                | RepositoryError::EmptyVector
                | RepositoryError::NonFiniteFeature { .. },
            )
            | MatchError::DimensionMismatch { .. }
            | MatchError::NonFiniteFeature { .. } => GatewayError::InvalidRequest(message),
            MatchError::Repository(
                RepositoryError::Storage(_) | RepositoryError::CorruptRecord { .. },
            ) => GatewayError::StorageError(message),
            MatchError::EncodeFailed {
                source: EncodeError::InvalidImage { .. } | EncodeError::SequenceTooLong { .. },
                ..
            } => GatewayError::InvalidRequest(message),
            MatchError::EncodeFailed { .. } => GatewayError::EncodingFailed(message),
            MatchError::ModelSetup(_) => GatewayError::InternalError(message),
        }
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, clipstore_status) = match &self {
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            GatewayError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            GatewayError::Conflict(_) => (StatusCode::CONFLICT, "key_exists"),
            GatewayError::StorageError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
            GatewayError::EncodingFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "encode_error")
            }
            GatewayError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            CLIPSTORE_STATUS_HEADER,
            HeaderValue::from_static(clipstore_status),
        );

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
