use crate::app_state::AppState;
use crate::models::job::CorrelationId;
use crate::models::video::{JobMessage, JobParameters, UploadedFiles};
use crate::services::claim_check::ClaimCheckError;
use crate::services::correlation::CorrelationError;
use crate::services::queue::QueueError;

/// Accept a video creation request and hand it to the worker pool.
///
/// Order matters: parameters are validated and attachments uploaded before
/// the id is registered, and the id is registered before the job is
/// published, so a result can never arrive for an unknown id.
pub async fn submit_job(
    state: &AppState,
    parameters: JobParameters,
    files: UploadedFiles,
) -> Result<CorrelationId, SubmitError> {
    let correlation_id = CorrelationId::generate();
    tracing::info!(
        correlation_id = %correlation_id,
        images = files.images.len(),
        speech = files.speech.is_some(),
        music = files.music.is_some(),
        "Received video creation request"
    );

    parameters
        .check()
        .map_err(|reason| SubmitError::Validation(correlation_id.clone(), reason))?;

    let claim_check = state
        .claim_checks
        .build(files)
        .await
        .map_err(|e| match e {
            e if e.is_validation() => SubmitError::Validation(correlation_id.clone(), e.to_string()),
            e => SubmitError::Upload(correlation_id.clone(), e),
        })?;

    state
        .correlations
        .register(correlation_id.clone())
        .map_err(|e| SubmitError::Registration(correlation_id.clone(), e))?;

    let job = JobMessage::new(correlation_id.clone(), claim_check, parameters);
    if let Err(e) = state.producer.publish(&job).await {
        tracing::error!(correlation_id = %correlation_id, error = %e, "Failed to publish job");
        state
            .correlations
            .mark_failed(correlation_id.as_str(), format!("job could not be queued: {e}"));
        return Err(SubmitError::Publish(correlation_id, e));
    }

    metrics::counter!("video_jobs_submitted_total").increment(1);
    Ok(correlation_id)
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{1}")]
    Validation(CorrelationId, String),

    #[error("Failed to store attachments: {1}")]
    Upload(CorrelationId, #[source] ClaimCheckError),

    #[error("Failed to register request: {1}")]
    Registration(CorrelationId, #[source] CorrelationError),

    #[error("Failed to queue video creation job: {1}")]
    Publish(CorrelationId, #[source] QueueError),
}

impl SubmitError {
    pub fn correlation_id(&self) -> &CorrelationId {
        match self {
            SubmitError::Validation(id, _)
            | SubmitError::Upload(id, _)
            | SubmitError::Registration(id, _)
            | SubmitError::Publish(id, _) => id,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            SubmitError::Validation(..) => "validation",
            SubmitError::Upload(..) => "upload",
            SubmitError::Registration(..) => "registration",
            SubmitError::Publish(..) => "publish",
        }
    }
}
