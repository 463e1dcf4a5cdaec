//! In-memory correlation tracking for jobs handed to the worker pool.
//!
//! Every submitted job is registered here before its message is published.
//! Worker results arriving on the response topic are folded into the entry,
//! and the status endpoint reads it back. Entries move through
//! `processing -> completed | failed` and never leave a terminal state.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::models::job::{CorrelationId, JobStatus, PendingRequest, StatusUpdate};

/// What `apply_update` did with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Progress or hostname merged; the job is still processing.
    Progressed,
    /// The job reached a terminal state.
    Resolved,
    /// Same terminal content as already recorded.
    DuplicateTerminal,
    /// The job was already terminal; the update was dropped.
    IgnoredTerminal,
    /// No job is registered under this id.
    UnknownId,
}

impl UpdateOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOutcome::Progressed => "progressed",
            UpdateOutcome::Resolved => "resolved",
            UpdateOutcome::DuplicateTerminal => "duplicate_terminal",
            UpdateOutcome::IgnoredTerminal => "ignored_terminal",
            UpdateOutcome::UnknownId => "unknown_id",
        }
    }
}

/// Shared lifecycle state for in-flight jobs, keyed by correlation id.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    entries: DashMap<CorrelationId, PendingRequest>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `id` in the processing state.
    pub fn register(&self, id: CorrelationId) -> Result<(), CorrelationError> {
        match self.entries.entry(id) {
            Entry::Occupied(occupied) => {
                return Err(CorrelationError::DuplicateRegistration(occupied.key().clone()));
            }
            Entry::Vacant(vacant) => {
                let request = PendingRequest::new(vacant.key().clone());
                vacant.insert(request);
            }
        }
        // Shard guard must be released before len() takes its read locks.
        metrics::gauge!("correlation_entries").set(self.entries.len() as f64);
        Ok(())
    }

    /// Fold a worker update into the tracked job.
    pub fn apply_update(&self, id: &str, update: &StatusUpdate) -> UpdateOutcome {
        let Some(mut entry) = self.entries.get_mut(id) else {
            warn!(correlation_id = id, status = %update.status, "Update for unknown correlation id");
            return UpdateOutcome::UnknownId;
        };
        let request = entry.value_mut();

        if request.status.is_terminal() {
            let same = update.status == request.status
                && update.result_key == request.result_key
                && update.error == request.error;
            if same {
                debug!(correlation_id = id, status = %request.status, "Duplicate terminal update");
                return UpdateOutcome::DuplicateTerminal;
            }
            warn!(
                correlation_id = id,
                current = %request.status,
                incoming = %update.status,
                "Update after terminal state ignored"
            );
            return UpdateOutcome::IgnoredTerminal;
        }

        let now = Utc::now();
        if let Some(progress) = update.progress {
            request.progress = Some(progress.min(100));
        }
        if let Some(hostname) = &update.hostname {
            request.hostname = Some(hostname.clone());
        }
        request.updated_at = now;

        if !update.status.is_terminal() {
            return UpdateOutcome::Progressed;
        }

        request.status = update.status;
        request.result_key = update.result_key.clone();
        request.error = update.error.clone();
        request.resolved_at = Some(now);
        if update.status == JobStatus::Completed && update.progress.is_none() {
            request.progress = Some(100);
        }
        UpdateOutcome::Resolved
    }

    /// Mark a registered job failed from the gateway side, e.g. when its
    /// message never reached the queue.
    pub fn mark_failed(&self, id: &str, detail: impl Into<String>) -> UpdateOutcome {
        self.apply_update(id, &StatusUpdate::failed(detail))
    }

    /// Snapshot of the tracked job, or `None` if it was never registered (or evicted).
    pub fn get_status(&self, id: &str) -> Option<PendingRequest> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Drop terminal entries resolved before `cutoff`. Returns how many were removed.
    pub fn evict_resolved_before(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, request| match request.resolved_at {
            Some(resolved_at) => resolved_at >= cutoff,
            None => true,
        });
        let after = self.entries.len();
        metrics::gauge!("correlation_entries").set(after as f64);
        before.saturating_sub(after)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CorrelationError {
    #[error("Correlation id already registered: {0}")]
    DuplicateRegistration(CorrelationId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn registered(id: &str) -> CorrelationStore {
        let store = CorrelationStore::new();
        store.register(CorrelationId::from(id)).unwrap();
        store
    }

    #[test]
    fn test_unregistered_is_absent() {
        let store = CorrelationStore::new();
        assert!(store.get_status("never-seen").is_none());
    }

    #[test]
    fn test_register_starts_processing() {
        let store = registered("abc");
        let request = store.get_status("abc").unwrap();
        assert_eq!(request.status, JobStatus::Processing);
        assert!(request.progress.is_none());
        assert!(request.result_key.is_none());
        assert!(request.resolved_at.is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let store = registered("abc");
        let err = store.register(CorrelationId::from("abc")).unwrap_err();
        assert!(matches!(err, CorrelationError::DuplicateRegistration(id) if id.as_str() == "abc"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_progress_then_completion_then_late_progress() {
        let store = registered("abc");

        let outcome = store.apply_update("abc", &StatusUpdate::progress(40));
        assert_eq!(outcome, UpdateOutcome::Progressed);
        let request = store.get_status("abc").unwrap();
        assert_eq!(request.status, JobStatus::Processing);
        assert_eq!(request.progress, Some(40));

        let outcome = store.apply_update("abc", &StatusUpdate::completed("out.mp4"));
        assert_eq!(outcome, UpdateOutcome::Resolved);
        let request = store.get_status("abc").unwrap();
        assert_eq!(request.status, JobStatus::Completed);
        assert_eq!(request.result_key.as_deref(), Some("out.mp4"));
        assert!(request.resolved_at.is_some());

        let outcome = store.apply_update("abc", &StatusUpdate::progress(90));
        assert_eq!(outcome, UpdateOutcome::IgnoredTerminal);
        let request = store.get_status("abc").unwrap();
        assert_eq!(request.status, JobStatus::Completed);
        assert_eq!(request.result_key.as_deref(), Some("out.mp4"));
    }

    #[test]
    fn test_terminal_state_is_final() {
        let store = registered("abc");
        store.apply_update("abc", &StatusUpdate::failed("render crashed"));

        assert_eq!(
            store.apply_update("abc", &StatusUpdate::failed("render crashed")),
            UpdateOutcome::DuplicateTerminal
        );
        assert_eq!(
            store.apply_update("abc", &StatusUpdate::completed("late.mp4")),
            UpdateOutcome::IgnoredTerminal
        );

        let request = store.get_status("abc").unwrap();
        assert_eq!(request.status, JobStatus::Failed);
        assert_eq!(request.error.as_deref(), Some("render crashed"));
        assert!(request.result_key.is_none());
    }

    #[test]
    fn test_hostname_merged() {
        let store = registered("abc");
        store.apply_update("abc", &StatusUpdate::progress(10).with_hostname("worker-7"));
        store.apply_update("abc", &StatusUpdate::progress(20));
        let request = store.get_status("abc").unwrap();
        assert_eq!(request.hostname.as_deref(), Some("worker-7"));
        assert_eq!(request.progress, Some(20));
    }

    #[test]
    fn test_unknown_id_not_created() {
        let store = CorrelationStore::new();
        assert_eq!(
            store.apply_update("ghost", &StatusUpdate::completed("x.mp4")),
            UpdateOutcome::UnknownId
        );
        assert!(store.get_status("ghost").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_mark_failed() {
        let store = registered("abc");
        assert_eq!(store.mark_failed("abc", "publish failed"), UpdateOutcome::Resolved);
        let request = store.get_status("abc").unwrap();
        assert_eq!(request.status, JobStatus::Failed);
        assert_eq!(request.error.as_deref(), Some("publish failed"));
    }

    #[test]
    fn test_eviction_only_touches_old_terminal_entries() {
        let store = CorrelationStore::new();
        for id in ["done", "failed", "running"] {
            store.register(CorrelationId::from(id)).unwrap();
        }
        store.apply_update("done", &StatusUpdate::completed("done.mp4"));
        store.apply_update("failed", &StatusUpdate::failed("boom"));

        // Nothing resolved before a cutoff in the past.
        let past = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(store.evict_resolved_before(past), 0);
        assert_eq!(store.len(), 3);

        let future = Utc::now() + chrono::Duration::seconds(1);
        assert_eq!(store.evict_resolved_before(future), 2);
        assert!(store.get_status("done").is_none());
        assert!(store.get_status("failed").is_none());
        assert_eq!(
            store.get_status("running").map(|r| r.status),
            Some(JobStatus::Processing)
        );
    }

    #[test]
    fn test_concurrent_registration_and_updates() {
        let store = Arc::new(CorrelationStore::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for n in 0..100 {
                        let id = format!("job-{worker}-{n}");
                        store.register(CorrelationId::from(id.as_str())).unwrap();
                        store.apply_update(&id, &StatusUpdate::progress(50));
                        store.apply_update(&id, &StatusUpdate::completed(format!("{id}.mp4")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 800);
        let request = store.get_status("job-3-42").unwrap();
        assert_eq!(request.status, JobStatus::Completed);
        assert_eq!(request.result_key.as_deref(), Some("job-3-42.mp4"));
    }
}
