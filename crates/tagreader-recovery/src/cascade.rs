//! Consecutive failure tracking across read calls.
//!
//! One read call retrying at three levels is a single data point. The
//! tracker counts read calls whose terminal outcome was a system fault, so
//! that a *pattern* of failing calls can be told apart from one bad read.
//! The count survives between calls and is shared by every caller of the
//! same reader; only a successful read clears it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tagreader_core::constants::CASCADE_THRESHOLD;
use tracing::debug;

/// Reader-wide counter of consecutive failed read calls.
#[derive(Debug)]
pub struct FailureCascadeTracker {
    count: Mutex<u32>,
    threshold: u32,
}

impl Default for FailureCascadeTracker {
    fn default() -> Self {
        Self::new(CASCADE_THRESHOLD)
    }
}

impl FailureCascadeTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            count: Mutex::new(0),
            threshold,
        }
    }

    /// Count one more failed read call and return the new total.
    pub fn record_failure(&self) -> u32 {
        let mut count = self.lock();
        *count = count.saturating_add(1);
        debug!(consecutive_failures = *count, "Recorded failed read");
        *count
    }

    /// Clear the count after a successful read call.
    pub fn record_success(&self) {
        let mut count = self.lock();
        if *count > 0 {
            debug!(cleared = *count, "Failure cascade cleared");
        }
        *count = 0;
    }

    /// Whether `count` consecutive failures warrant an external reset.
    pub fn is_cascading(&self, count: u32) -> bool {
        count >= self.threshold
    }

    pub fn current(&self) -> u32 {
        *self.lock()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    fn lock(&self) -> MutexGuard<'_, u32> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;

    #[test]
    fn test_failures_accumulate() {
        let tracker = FailureCascadeTracker::default();
        assert_eq!(tracker.record_failure(), 1);
        assert_eq!(tracker.record_failure(), 2);
        assert_eq!(tracker.record_failure(), 3);
        assert_eq!(tracker.current(), 3);
    }

    #[test]
    fn test_success_resets() {
        let tracker = FailureCascadeTracker::default();
        tracker.record_failure();
        tracker.record_failure();
        tracker.record_success();

        assert_eq!(tracker.current(), 0);
        assert_eq!(tracker.record_failure(), 1);
    }

    #[rstest]
    #[case(0, false)]
    #[case(2, false)]
    #[case(3, true)]
    #[case(4, true)]
    fn test_is_cascading(#[case] count: u32, #[case] expected: bool) {
        let tracker = FailureCascadeTracker::default();
        assert_eq!(tracker.is_cascading(count), expected);
    }

    #[test]
    fn test_custom_threshold() {
        let tracker = FailureCascadeTracker::new(1);
        let count = tracker.record_failure();
        assert!(tracker.is_cascading(count));
    }

    #[test]
    fn test_concurrent_failures_are_not_lost() {
        let tracker = Arc::new(FailureCascadeTracker::default());

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        tracker.record_failure();
                    }
                })
            })
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(tracker.current(), 1000);
    }
}
