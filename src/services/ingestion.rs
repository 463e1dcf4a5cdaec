use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::models::job::ResultMessage;
use crate::services::correlation::{CorrelationStore, UpdateOutcome};
use crate::services::queue::{Delivery, MessageSource};

const RETRY_BACKOFF_MS: u64 = 1000;

/// What happened to a single result message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Malformed,
    MissingCorrelationId,
    Applied(UpdateOutcome),
}

impl IngestOutcome {
    fn label(self) -> &'static str {
        match self {
            IngestOutcome::Malformed => "malformed",
            IngestOutcome::MissingCorrelationId => "missing_correlation_id",
            IngestOutcome::Applied(outcome) => outcome.as_str(),
        }
    }
}

/// Feeds worker results from the response topic into the correlation store.
pub struct ResponseIngestor {
    store: Arc<CorrelationStore>,
}

impl ResponseIngestor {
    pub fn new(store: Arc<CorrelationStore>) -> Self {
        Self { store }
    }

    /// Decode one raw message and apply it. Never fails: bad messages are logged and dropped.
    pub fn ingest(&self, payload: &[u8]) -> IngestOutcome {
        let outcome = self.ingest_inner(payload);
        metrics::counter!("result_messages_total", "outcome" => outcome.label()).increment(1);
        outcome
    }

    fn ingest_inner(&self, payload: &[u8]) -> IngestOutcome {
        let message: ResultMessage = match serde_json::from_slice(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, bytes = payload.len(), "Dropping malformed result message");
                return IngestOutcome::Malformed;
            }
        };

        let (correlation_id, update) = message.into_update();
        let Some(correlation_id) = correlation_id else {
            tracing::warn!(status = %update.status, "Dropping result message without correlation id");
            return IngestOutcome::MissingCorrelationId;
        };

        let outcome = self.store.apply_update(correlation_id.as_str(), &update);
        match outcome {
            UpdateOutcome::Resolved => tracing::info!(
                correlation_id = %correlation_id,
                status = %update.status,
                result_key = update.result_key.as_deref().unwrap_or(""),
                "Job resolved"
            ),
            UpdateOutcome::Progressed => tracing::debug!(
                correlation_id = %correlation_id,
                progress = update.progress,
                "Job progress"
            ),
            _ => {}
        }
        IngestOutcome::Applied(outcome)
    }

    /// Apply a batch and acknowledge every delivery in it, malformed ones included.
    pub async fn handle_batch<S>(&self, source: &S, batch: Vec<Delivery>)
    where
        S: MessageSource + ?Sized,
    {
        if batch.is_empty() {
            return;
        }

        let ids: Vec<String> = batch
            .into_iter()
            .map(|delivery| {
                self.ingest(&delivery.payload);
                delivery.id
            })
            .collect();

        if let Err(e) = source.ack(&ids).await {
            // Unacked entries stay pending in the group; redelivery is harmless
            // because terminal updates are idempotent.
            tracing::error!(error = %e, count = ids.len(), "Failed to acknowledge result messages");
        }
    }

    /// Consume results until `shutdown` fires.
    pub async fn run<S>(&self, source: &S, shutdown: CancellationToken)
    where
        S: MessageSource + ?Sized,
    {
        tracing::info!("Result ingestion started");

        loop {
            let batch = tokio::select! {
                _ = shutdown.cancelled() => break,
                polled = source.poll() => polled,
            };

            match batch {
                Ok(batch) => self.handle_batch(source, batch).await,
                Err(e) => {
                    tracing::error!(error = %e, "Error reading result messages, will retry");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = sleep(Duration::from_millis(RETRY_BACKOFF_MS)) => {}
                    }
                }
            }
        }

        tracing::info!("Result ingestion stopped");
    }
}
