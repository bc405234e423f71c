use std::sync::Arc;

use crate::websocket::typing::TypingTracker;

const SWEEP_INTERVAL_SECS: u64 = 30;

/// Periodically drops expired typing entries. Expiry itself is evaluated on
/// read; this only keeps the map from accumulating every user who ever
/// typed.
pub fn start_typing_sweep(tracker: Arc<TypingTracker>) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(SWEEP_INTERVAL_SECS));

        loop {
            interval.tick().await;

            let pruned = tracker.prune_expired();
            if pruned > 0 {
                tracing::debug!("Typing sweep pruned {} expired entries", pruned);
            }
        }
    });
}
