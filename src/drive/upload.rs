//! Upload cancellation marks.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long a cancellation mark is kept for an upload that never shows up.
pub const DEFAULT_CANCEL_TTL: Duration = Duration::from_secs(60 * 60);

/// Upload ids the client asked to cancel.
///
/// A mark may arrive before, during, or after the upload it names. The
/// upload consumes its mark when it sees it; marks nobody consumes expire.
#[derive(Debug)]
pub struct UploadTracker {
    cancelled: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl Default for UploadTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CANCEL_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cancelled: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Mark `upload_id` as cancelled.
    pub fn cancel(&self, upload_id: &str) {
        let mut marks = self.lock();
        Self::prune(&mut marks, self.ttl);
        marks.insert(upload_id.to_string(), Instant::now());
        tracing::info!("Upload {} marked for cancellation", upload_id);
    }

    /// Consume the mark of `upload_id`, returning whether there was one.
    pub fn take_cancelled(&self, upload_id: &str) -> bool {
        let mut marks = self.lock();
        Self::prune(&mut marks, self.ttl);
        marks.remove(upload_id).is_some()
    }

    /// Number of live marks.
    pub fn pending(&self) -> usize {
        let mut marks = self.lock();
        Self::prune(&mut marks, self.ttl);
        marks.len()
    }

    /// Drop expired marks, returning how many went.
    pub fn prune_expired(&self) -> usize {
        let mut marks = self.lock();
        let before = marks.len();
        Self::prune(&mut marks, self.ttl);
        before - marks.len()
    }

    fn prune(marks: &mut HashMap<String, Instant>, ttl: Duration) {
        marks.retain(|_, marked_at| marked_at.elapsed() < ttl);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        self.cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_and_take() {
        let tracker = UploadTracker::new();
        assert_eq!(tracker.pending(), 0);

        tracker.cancel("u1");
        assert_eq!(tracker.pending(), 1);
        assert!(!tracker.take_cancelled("u2"));

        assert!(tracker.take_cancelled("u1"));
        assert!(!tracker.take_cancelled("u1"));
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn test_marks_expire() {
        let tracker = UploadTracker::with_ttl(Duration::from_millis(0));
        tracker.cancel("u1");
        assert!(!tracker.take_cancelled("u1"));
        assert_eq!(tracker.pending(), 0);
        assert_eq!(tracker.prune_expired(), 0);
    }
}
