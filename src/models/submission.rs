use serde::Serialize;

use super::job::{CorrelationId, JobStatus, PendingRequest};

/// Response after accepting a video creation request.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub correlation_id: CorrelationId,
    pub message: String,
    pub poll_url: String,
}

impl SubmitResponse {
    pub fn accepted(correlation_id: CorrelationId) -> Self {
        let poll_url = format!("/v1/video-creation/{correlation_id}");
        Self {
            message: format!(
                "Video processing started. Use GET {poll_url} to check status or download when ready."
            ),
            correlation_id,
            poll_url,
        }
    }
}

/// Response for a job that has not produced a downloadable result.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub correlation_id: CorrelationId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&PendingRequest> for JobStatusResponse {
    fn from(request: &PendingRequest) -> Self {
        Self {
            correlation_id: request.correlation_id.clone(),
            status: request.status,
            progress: request.progress,
            hostname: request.hostname.clone(),
            error: request.error.clone(),
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}
