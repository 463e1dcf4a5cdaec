use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::job::CorrelationId;
use crate::models::submission::ErrorResponse;
use crate::services::status::StatusError;
use crate::services::submission::SubmitError;

/// Errors surfaced to HTTP callers, rendered as JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Status(#[from] StatusError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Submit(SubmitError::Validation(..)) => StatusCode::BAD_REQUEST,
            ApiError::Submit(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Status(StatusError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Status(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn correlation_id(&self) -> Option<CorrelationId> {
        match self {
            ApiError::BadRequest(_) => None,
            ApiError::Submit(e) => Some(e.correlation_id().clone()),
            ApiError::Status(StatusError::NotFound(id)) => Some(id.clone()),
            ApiError::Status(StatusError::ResultMissing { correlation_id, .. }) => {
                Some(correlation_id.clone())
            }
            ApiError::Status(StatusError::Storage(_)) => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        // Server-side details stay in the logs.
        let error = if status.is_server_error() {
            match &self {
                ApiError::Submit(_) => "Failed to process video creation request".to_string(),
                _ => "Failed to retrieve video result".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            correlation_id: self.correlation_id(),
        };
        (status, Json(body)).into_response()
    }
}
