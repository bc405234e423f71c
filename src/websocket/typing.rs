use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::{Duration, Instant};

/// How long a typing indicator stays alive after the last announcement.
pub const TYPING_WINDOW: Duration = Duration::from_secs(2);

/// Ephemeral typing presence. Nothing here is persisted or replayed; each
/// (conversation, user) pair carries a single deadline that every new
/// announcement resets, so per-keystroke announcements never accumulate
/// timers.
pub struct TypingTracker {
    window: Duration,
    deadlines: Mutex<HashMap<(String, String), Instant>>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::with_window(TYPING_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            deadlines: Mutex::new(HashMap::new()),
        }
    }

    pub fn announce(&self, conversation_id: &str, user_id: &str) {
        let mut deadlines = self.deadlines.lock().expect("typing lock poisoned");
        deadlines.insert(
            (conversation_id.to_string(), user_id.to_string()),
            Instant::now() + self.window,
        );
    }

    /// Users still inside their silence window for this conversation.
    /// Expiry is evaluated on read, so there is no stopped-typing event to
    /// miss.
    pub fn active_typists(&self, conversation_id: &str) -> Vec<String> {
        let now = Instant::now();
        let deadlines = self.deadlines.lock().expect("typing lock poisoned");
        deadlines
            .iter()
            .filter(|((conv, _), deadline)| conv == conversation_id && **deadline > now)
            .map(|((_, user), _)| user.clone())
            .collect()
    }

    /// Drops expired entries. Called from the background sweep so the map
    /// does not grow with every user who ever typed.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut deadlines = self.deadlines.lock().expect("typing lock poisoned");
        let before = deadlines.len();
        deadlines.retain(|_, deadline| *deadline > now);
        before - deadlines.len()
    }
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    #[tokio::test(start_paused = true)]
    async fn test_typing_expires_after_silence_window() {
        let tracker = TypingTracker::new();

        tracker.announce("conv-1", "buyer");
        assert_eq!(tracker.active_typists("conv-1"), vec!["buyer".to_string()]);

        time::advance(Duration::from_millis(2100)).await;
        assert!(tracker.active_typists("conv-1").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reannouncement_resets_single_window() {
        let tracker = TypingTracker::new();

        tracker.announce("conv-1", "buyer");
        time::advance(Duration::from_millis(1500)).await;

        // Fresh keystroke inside the window: deadline moves, nothing fires.
        tracker.announce("conv-1", "buyer");
        time::advance(Duration::from_millis(1500)).await;
        assert_eq!(tracker.active_typists("conv-1"), vec!["buyer".to_string()]);

        time::advance(Duration::from_millis(600)).await;
        assert!(tracker.active_typists("conv-1").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_typists_scoped_per_conversation() {
        let tracker = TypingTracker::new();

        tracker.announce("conv-1", "buyer");
        tracker.announce("conv-2", "seller");

        assert_eq!(tracker.active_typists("conv-1"), vec!["buyer".to_string()]);
        assert_eq!(tracker.active_typists("conv-2"), vec!["seller".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_drops_only_expired() {
        let tracker = TypingTracker::new();

        tracker.announce("conv-1", "buyer");
        time::advance(Duration::from_millis(1000)).await;
        tracker.announce("conv-1", "seller");
        time::advance(Duration::from_millis(1500)).await;

        // buyer expired at 2s, seller lives until 3s.
        assert_eq!(tracker.prune_expired(), 1);
        assert_eq!(tracker.active_typists("conv-1"), vec!["seller".to_string()]);
    }
}
