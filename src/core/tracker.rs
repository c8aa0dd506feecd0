//! Completion tracker: wait until a known number of units have reported.
//!
//! Units record the identifier of the order they finished; one coordinator
//! waits until the expected count is reached. The count is published on a
//! `watch` channel, so the waiter wakes as soon as the last record lands
//! instead of polling.

use std::collections::HashSet;
use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

/// Errors recording into the tracker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("Order already recorded: {0}")]
    Duplicate(String),

    #[error("Tracker already full ({expected} of {expected}), cannot record {order_id}")]
    Overflow { order_id: String, expected: usize },
}

#[derive(Debug, Default)]
struct Recorded {
    order: Vec<String>,
    seen: HashSet<String>,
}

/// Shared set of completed order identifiers with a counting wait
#[derive(Debug)]
pub struct CompletionTracker {
    expected: usize,
    recorded: Mutex<Recorded>,
    count: watch::Sender<usize>,
}

impl CompletionTracker {
    /// Create a tracker waiting for `expected` records
    pub fn new(expected: usize) -> Self {
        let (count, _) = watch::channel(0);
        Self {
            expected,
            recorded: Mutex::new(Recorded::default()),
            count,
        }
    }

    /// Record one completed order; returns the new count.
    ///
    /// Rejects an identifier that was already recorded and any record past
    /// the expected count, so the size never exceeds `expected`.
    pub fn record(&self, order_id: impl Into<String>) -> Result<usize, TrackerError> {
        let order_id = order_id.into();
        let mut recorded = self
            .recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if recorded.seen.contains(&order_id) {
            return Err(TrackerError::Duplicate(order_id));
        }
        if recorded.order.len() >= self.expected {
            return Err(TrackerError::Overflow {
                order_id,
                expected: self.expected,
            });
        }

        recorded.seen.insert(order_id.clone());
        recorded.order.push(order_id);
        let len = recorded.order.len();

        // Published under the lock so waiters never see the count go backwards
        self.count.send_replace(len);
        debug!(count = len, expected = self.expected, "Recorded completion");

        Ok(len)
    }

    /// Wait until the expected count is reached; returns that count.
    ///
    /// There is no timeout.
    pub async fn wait(&self) -> usize {
        let mut rx = self.count.subscribe();
        let expected = self.expected;
        // The sender lives in `self`, so the channel cannot close while we borrow it
        let _ = rx.wait_for(|count| *count >= expected).await;
        self.len()
    }

    pub fn len(&self) -> usize {
        *self.count.borrow()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn is_complete(&self) -> bool {
        self.len() >= self.expected
    }

    /// Snapshot of recorded identifiers, in recording order
    pub fn recorded(&self) -> Vec<String> {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .order
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_zero_expected_returns_immediately() {
        let tracker = CompletionTracker::new(0);
        assert_eq!(tracker.wait().await, 0);
        assert!(tracker.is_complete());
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let tracker = CompletionTracker::new(3);
        assert_eq!(tracker.record("OD-1"), Ok(1));
        assert_eq!(
            tracker.record("OD-1"),
            Err(TrackerError::Duplicate("OD-1".to_string()))
        );
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_over_insertion_is_rejected() {
        let tracker = CompletionTracker::new(1);
        tracker.record("OD-1").unwrap();

        let err = tracker.record("OD-2").unwrap_err();
        assert!(matches!(err, TrackerError::Overflow { expected: 1, .. }));
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.recorded(), vec!["OD-1".to_string()]);
    }

    #[tokio::test]
    async fn test_wait_blocks_until_expected_count() {
        let tracker = Arc::new(CompletionTracker::new(2));

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.wait().await })
        };

        tracker.record("OD-1").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        tracker.record("OD-2").unwrap();
        let count = tokio::time::timeout(Duration::from_millis(500), waiter)
            .await
            .expect("waiter should wake after last record")
            .unwrap();
        assert_eq!(count, 2);
    }
}
