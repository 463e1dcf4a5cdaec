use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::services::correlation::CorrelationStore;

/// Periodically drop finished jobs older than `retention` until `shutdown` fires.
pub async fn run_sweeper(
    store: Arc<CorrelationStore>,
    retention: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let retention = match chrono::Duration::from_std(retention) {
        Ok(retention) => retention,
        Err(e) => {
            tracing::error!(error = %e, "Retention window out of range, sweeper disabled");
            return;
        }
    };

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = store.evict_resolved_before(Utc::now() - retention);
                if evicted > 0 {
                    tracing::info!(evicted, remaining = store.len(), "Evicted finished jobs");
                }
            }
        }
    }
}
