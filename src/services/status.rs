use crate::models::job::{CorrelationId, JobStatus, PendingRequest};
use crate::services::correlation::CorrelationStore;
use crate::services::storage::{ObjectStore, ObjectStream, StorageError};

/// What a status query resolves to.
pub enum JobView {
    /// Still running, or finished with a failure; answered from the store alone.
    Pending(PendingRequest),
    /// Finished successfully; the result object is ready to stream.
    Ready { result_key: String, body: ObjectStream },
}

/// Answer a status query. Reads the store, never writes it.
pub async fn resolve_job(
    store: &CorrelationStore,
    storage: &dyn ObjectStore,
    correlation_id: &str,
) -> Result<JobView, StatusError> {
    let request = store
        .get_status(correlation_id)
        .ok_or_else(|| StatusError::NotFound(CorrelationId::from(correlation_id)))?;

    if request.status != JobStatus::Completed {
        return Ok(JobView::Pending(request));
    }

    let Some(result_key) = request.result_key.clone() else {
        return Err(result_missing(request.correlation_id, None));
    };

    if !storage.exists(&result_key).await? {
        return Err(result_missing(request.correlation_id, Some(result_key)));
    }

    match storage.download_stream(&result_key).await {
        Ok(body) => Ok(JobView::Ready { result_key, body }),
        Err(StorageError::NotFound(_)) => {
            Err(result_missing(request.correlation_id, Some(result_key)))
        }
        Err(e) => Err(StatusError::Storage(e)),
    }
}

fn result_missing(correlation_id: CorrelationId, result_key: Option<String>) -> StatusError {
    tracing::error!(
        correlation_id = %correlation_id,
        result_key = result_key.as_deref().unwrap_or(""),
        "Job completed but its result object is missing"
    );
    metrics::counter!("result_missing_total").increment(1);
    StatusError::ResultMissing {
        correlation_id,
        result_key,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("Video not found: {0}")]
    NotFound(CorrelationId),

    #[error("Result for {correlation_id} is missing from object storage")]
    ResultMissing {
        correlation_id: CorrelationId,
        result_key: Option<String>,
    },

    #[error("Failed to read result: {0}")]
    Storage(#[from] StorageError),
}
