//! Per-session view de-duplication.
//!
//! The session layer asks [`ViewTracker::first_view`] before counting a view;
//! a session re-reading the same article inside the window is not counted.

use crate::app_config::ViewsConfig;
use moka::sync::Cache;
use std::time::Duration;

pub struct ViewTracker {
    seen: Cache<(String, i32), ()>,
}

impl ViewTracker {
    pub fn new(config: &ViewsConfig) -> Self {
        Self::with_window(
            Duration::from_secs(config.dedup_window_minutes * 60),
            config.max_tracked,
        )
    }

    pub fn with_window(window: Duration, max_tracked: u64) -> Self {
        Self {
            seen: Cache::builder()
                .time_to_live(window)
                .max_capacity(max_tracked)
                .build(),
        }
    }

    /// True the first time `session` views `article_id` within the window.
    pub fn first_view(&self, session: &str, article_id: i32) -> bool {
        self.seen
            .entry((session.to_string(), article_id))
            .or_insert(())
            .is_fresh()
    }

    /// Forget every recorded view.
    pub fn clear(&self) {
        self.seen.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_view_suppressed() {
        let tracker = ViewTracker::new(&ViewsConfig::default());
        assert!(tracker.first_view("s1", 1));
        assert!(!tracker.first_view("s1", 1));
        assert!(tracker.first_view("s2", 1));
        assert!(tracker.first_view("s1", 2));
    }

    #[test]
    fn test_window_expires() {
        let tracker = ViewTracker::with_window(Duration::from_millis(50), 100);
        assert!(tracker.first_view("s1", 1));
        std::thread::sleep(Duration::from_millis(120));
        assert!(tracker.first_view("s1", 1));
    }

    #[test]
    fn test_clear_forgets() {
        let tracker = ViewTracker::new(&ViewsConfig::default());
        assert!(tracker.first_view("s1", 1));
        tracker.clear();
        assert!(tracker.first_view("s1", 1));
    }
}
