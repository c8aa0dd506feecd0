//! Workflow Integration Tests
//!
//! End-to-end runs of the order workflow against a scripted endpoint.

use async_trait::async_trait;
use orderflow::config::LookupSettings;
use orderflow::core::workflow::REJECTION_MESSAGE;
use orderflow::{
    Order, OrderResponse, Orchestrator, OrderWorkflow, RemoteEndpoint, RetryPolicy,
    ScriptedEndpoint,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Confirms `OD-0` quickly and every other order slowly
#[derive(Default)]
struct StaggeredEndpoint {
    confirmations: AtomicUsize,
}

#[async_trait]
impl RemoteEndpoint for StaggeredEndpoint {
    fn name(&self) -> &str {
        "staggered"
    }

    async fn send_order(&self, order: &Order) -> OrderResponse {
        let delay = if order.order_id == "OD-0" { 10 } else { 200 };
        sleep(Duration::from_millis(delay)).await;
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        OrderResponse::confirmed(order.order_id.clone())
    }

    async fn send_push_message(&self, _order_id: &str) -> bool {
        true
    }
}

fn fast(max_attempts: Option<u32>) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        interval_ms: 1,
    }
}

fn workflow(endpoint: Arc<dyn RemoteEndpoint>) -> OrderWorkflow {
    OrderWorkflow::new(Orchestrator::new(4).unwrap(), endpoint)
        .with_confirm_policy(fast(None))
        .with_push_policy(fast(Some(3)))
}

#[tokio::test]
async fn test_tracked_batch_confirms_every_order() {
    let endpoint = Arc::new(ScriptedEndpoint::new().confirm_on(Some(3)));
    let workflow = workflow(endpoint.clone());

    let confirmed = workflow.confirm_batch_tracked(20).await.unwrap();

    assert_eq!(confirmed, 20);
    assert_eq!(endpoint.confirm_calls("OD-0"), 3);
    assert_eq!(endpoint.confirm_calls("OD-19"), 3);
}

#[tokio::test]
async fn test_tracked_batch_of_zero_returns_immediately() {
    let workflow = workflow(Arc::new(ScriptedEndpoint::new()));
    assert_eq!(workflow.confirm_batch_tracked(0).await.unwrap(), 0);
}

#[tokio::test]
async fn test_tracked_batch_fails_when_confirmation_is_bounded() {
    let endpoint = Arc::new(ScriptedEndpoint::new().confirm_on(None));
    let workflow = workflow(endpoint).with_confirm_policy(fast(Some(2)));

    let err = workflow.confirm_batch_tracked(3).await.unwrap_err();
    assert!(format!("{:#}", err).contains("not confirmed after 2 attempts"));
}

#[tokio::test]
async fn test_failed_tracked_batches_leave_no_tasks_behind() {
    let endpoint = Arc::new(ScriptedEndpoint::new().confirm_on(None));
    let workflow = workflow(endpoint).with_confirm_policy(fast(Some(1)));

    for _ in 0..5 {
        assert!(workflow.confirm_batch_tracked(3).await.is_err());
    }
    sleep(Duration::from_millis(200)).await;

    assert_eq!(workflow.orchestrator().alive_units(), 0);
}

#[tokio::test]
async fn test_notify_reports_every_failed_push() {
    let endpoint = Arc::new(ScriptedEndpoint::new().push_on(None));
    let workflow = workflow(endpoint.clone());

    let report = workflow.confirm_and_notify(10).await.unwrap();

    assert_eq!(report.order_count, 10);
    assert_eq!(report.confirmed, 10);
    assert_eq!(report.failed_pushes.len(), 10);
    assert!(report.failed_pushes.iter().all(|r| r.attempts == 3 && !r.success));
    assert_eq!(endpoint.total_push_calls(), 30);
    assert!(report.is_finished());
}

#[tokio::test]
async fn test_notify_with_late_delivery_has_no_failures() {
    let endpoint = Arc::new(ScriptedEndpoint::new().push_on(Some(2)));
    let workflow = workflow(endpoint.clone());

    let report = workflow.confirm_and_notify(5).await.unwrap();

    assert!(report.failed_pushes.is_empty());
    assert!(report.unit_failures.is_empty());
    assert_eq!(endpoint.push_calls("OD-0"), 2);
    assert_eq!(endpoint.total_push_calls(), 10);
}

#[tokio::test]
async fn test_notify_records_unconfirmed_orders_as_unit_failures() {
    let endpoint = Arc::new(ScriptedEndpoint::new().confirm_on(None));
    let workflow = workflow(endpoint.clone()).with_confirm_policy(fast(Some(2)));

    let report = workflow.confirm_and_notify(4).await.unwrap();

    assert_eq!(report.confirmed, 0);
    assert_eq!(report.unit_failures.len(), 4);
    assert!(report.unit_failures[0]
        .error
        .contains("not confirmed after 2 attempts"));
    assert_eq!(endpoint.total_push_calls(), 0);
}

#[tokio::test]
async fn test_create_and_confirm() {
    let endpoint = Arc::new(ScriptedEndpoint::new().confirm_on(Some(2)));
    let workflow = workflow(endpoint.clone());

    let order_id = workflow.create_and_confirm().await.unwrap();

    assert!(order_id.starts_with("OD-"));
    assert_eq!(endpoint.confirm_calls(&order_id), 2);
}

#[tokio::test]
async fn test_combine_item_and_shipping() {
    let workflow = workflow(Arc::new(ScriptedEndpoint::new())).with_lookups(LookupSettings {
        item_delay_ms: 100,
        shipping_delay_ms: 10,
    });
    let order = Order::new("OD-7", "ITEM-7", "addr 7", 1);
    let start = Instant::now();

    let summary = workflow.combine_item_and_shipping(&order).await.unwrap();

    assert_eq!(summary, "item = ITEM-7, address = addr 7");
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_confirm_all_keeps_submission_order() {
    let workflow = workflow(Arc::new(ScriptedEndpoint::new().confirm_on(Some(2))));

    let ids = workflow.confirm_all(6).await.unwrap();

    let expected: Vec<String> = (0..6).map(|i| format!("OD-{}", i)).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_confirm_any_returns_one_of_the_batch() {
    let workflow = workflow(Arc::new(ScriptedEndpoint::new()));

    let id = workflow.confirm_any(5).await.unwrap();

    let n: usize = id.trim_start_matches("OD-").parse().unwrap();
    assert!(n < 5);
}

#[tokio::test]
async fn test_confirm_any_finishes_the_rest_before_returning() {
    let endpoint = Arc::new(StaggeredEndpoint::default());
    let start = Instant::now();

    let first = {
        let workflow = workflow(endpoint.clone());
        workflow.confirm_any(5).await.unwrap()
    };

    assert_eq!(first, "OD-0");
    assert_eq!(endpoint.confirmations.load(Ordering::SeqCst), 5);
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_recovery_styles() {
    let workflow = workflow(Arc::new(ScriptedEndpoint::new()));

    assert_eq!(
        workflow.recover_with_handle(true).await.unwrap(),
        REJECTION_MESSAGE
    );
    assert_eq!(
        workflow.recover_exceptionally(true).await.unwrap(),
        REJECTION_MESSAGE
    );
    assert!(workflow
        .recover_with_handle(false)
        .await
        .unwrap()
        .starts_with("OD-"));
    assert!(workflow
        .recover_exceptionally(false)
        .await
        .unwrap()
        .starts_with("OD-"));
}
