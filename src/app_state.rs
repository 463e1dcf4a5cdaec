use std::sync::Arc;

use crate::services::{
    claim_check::ClaimCheckBuilder, correlation::CorrelationStore, queue::JobProducer,
    storage::ObjectStore,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub correlations: Arc<CorrelationStore>,
    pub storage: Arc<dyn ObjectStore>,
    pub claim_checks: Arc<ClaimCheckBuilder>,
    pub producer: Arc<JobProducer>,
}

impl AppState {
    pub fn new(
        correlations: Arc<CorrelationStore>,
        storage: Arc<dyn ObjectStore>,
        producer: JobProducer,
        max_image_files: usize,
    ) -> Self {
        Self {
            claim_checks: Arc::new(ClaimCheckBuilder::new(storage.clone(), max_image_files)),
            correlations,
            storage,
            producer: Arc::new(producer),
        }
    }
}
