//! Periodic sweep of expired magic-link tokens.
//!
//! Deletion only matches a time predicate, so the sweep is safe to run
//! concurrently with issue/verify and across multiple instances.

use tokio::time::{interval, Duration};

use super::MagicLinkService;

/// Spawn the background token cleanup task
pub fn spawn_cleanup_task(service: MagicLinkService, interval_secs: u64) {
    tracing::info!(interval_secs = interval_secs, "Starting token cleanup task");

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick.tick().await;
            match service.cleanup_expired().await {
                Ok(deleted) => {
                    if deleted > 0 {
                        tracing::info!(deleted = deleted, "Removed expired magic links");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Token cleanup cycle failed");
                }
            }
        }
    });
}
