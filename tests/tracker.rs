//! Completion Tracker Integration Tests
//!
//! Concurrent recording from many units while one coordinator waits.

use orderflow::core::TrackerError;
use orderflow::{CompletionTracker, Orchestrator};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_records_reach_expected_count() {
    let orchestrator = Orchestrator::new(8).unwrap();
    let tracker = Arc::new(CompletionTracker::new(100));

    let waiter = {
        let tracker = tracker.clone();
        orchestrator.supply(async move { tracker.wait().await })
    };

    let units: Vec<_> = (0..100)
        .map(|i| {
            let tracker = tracker.clone();
            orchestrator.supply(async move { tracker.record(format!("OD-{}", i)) })
        })
        .collect();

    let counts = orchestrator.all_of(units).join().await.unwrap();
    assert!(counts.iter().all(Result::is_ok));

    let count = tokio::time::timeout(Duration::from_secs(1), waiter.join())
        .await
        .expect("coordinator should wake")
        .unwrap();
    assert_eq!(count, 100);

    let recorded: HashSet<String> = tracker.recorded().into_iter().collect();
    assert_eq!(recorded.len(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_count_never_exceeds_expected_under_contention() {
    let orchestrator = Orchestrator::new(8).unwrap();
    let tracker = Arc::new(CompletionTracker::new(10));

    let units: Vec<_> = (0..40)
        .map(|i| {
            let tracker = tracker.clone();
            orchestrator.supply(async move { tracker.record(format!("OD-{}", i)) })
        })
        .collect();

    let outcomes = orchestrator.all_of(units).join().await.unwrap();

    let accepted = outcomes.iter().filter(|r| r.is_ok()).count();
    let overflowed = outcomes
        .iter()
        .filter(|r| matches!(r, Err(TrackerError::Overflow { .. })))
        .count();

    assert_eq!(accepted, 10);
    assert_eq!(overflowed, 30);
    assert_eq!(tracker.len(), 10);
    assert!(tracker.is_complete());
}
