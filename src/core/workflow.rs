//! Order workflow driver.
//!
//! Wires order creation, the retry loops, the orchestrator's combinators and
//! the completion tracker into the end-to-end pipeline runs. Every operation
//! joins the units it started before returning, so no work is left in
//! flight when the caller moves on.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{RandomEndpoint, RemoteEndpoint};
use crate::config::{LookupSettings, ResolvedConfig};
use crate::domain::{Order, OrderIdGenerator, PushMessageResult, WorkflowReport};

use super::orchestrator::Orchestrator;
use super::retry::{confirm_order, send_push_with_retry, RetryPolicy};
use super::task::TaskHandle;
use super::tracker::CompletionTracker;

/// Error text raised by the rejecting stage of the recovery demonstrations
pub const REJECTION_MESSAGE: &str = "throw Illegal Exception";

/// Drives orders through confirmation and notification
pub struct OrderWorkflow {
    orchestrator: Orchestrator,
    endpoint: Arc<dyn RemoteEndpoint>,
    ids: Arc<OrderIdGenerator>,
    confirm_policy: RetryPolicy,
    push_policy: RetryPolicy,
    lookups: LookupSettings,
}

impl OrderWorkflow {
    /// Create a workflow with default retry budgets and lookup delays
    pub fn new(orchestrator: Orchestrator, endpoint: Arc<dyn RemoteEndpoint>) -> Self {
        debug!(
            endpoint = endpoint.name(),
            workers = orchestrator.workers(),
            "Workflow ready"
        );
        Self {
            orchestrator,
            endpoint,
            ids: Arc::new(OrderIdGenerator::new()),
            confirm_policy: RetryPolicy::confirm_default(),
            push_policy: RetryPolicy::push_default(),
            lookups: LookupSettings::default(),
        }
    }

    /// Create a workflow backed by the random endpoint, sized from configuration
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let orchestrator = Orchestrator::from_config(config)?;
        let endpoint = RandomEndpoint::new(
            config.endpoint.confirm_success_rate,
            config.endpoint.push_success_rate,
        );

        Ok(Self::new(orchestrator, Arc::new(endpoint))
            .with_confirm_policy(config.confirm.clone())
            .with_push_policy(config.push.clone())
            .with_lookups(config.lookups.clone()))
    }

    pub fn with_confirm_policy(mut self, policy: RetryPolicy) -> Self {
        self.confirm_policy = policy;
        self
    }

    pub fn with_push_policy(mut self, policy: RetryPolicy) -> Self {
        self.push_policy = policy;
        self
    }

    pub fn with_lookups(mut self, lookups: LookupSettings) -> Self {
        self.lookups = lookups;
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Start one confirmation unit for `order`
    fn spawn_confirm(&self, order: Order) -> TaskHandle<String> {
        let endpoint = self.endpoint.clone();
        let policy = self.confirm_policy.clone();
        self.orchestrator.try_supply(async move {
            anyhow::Ok(confirm_order(endpoint.as_ref(), &order, &policy).await?)
        })
    }

    /// Confirm a batch of orders and wait on the completion tracker.
    ///
    /// Returns the number of confirmed orders, which equals `count`.
    #[instrument(skip(self))]
    pub async fn confirm_batch_tracked(&self, count: usize) -> Result<usize> {
        let tracker = Arc::new(CompletionTracker::new(count));

        let units: Vec<TaskHandle<()>> = self
            .ids
            .create_order_batch(count)
            .into_iter()
            .map(|order| {
                let tracker = tracker.clone();
                self.spawn_confirm(order).try_map(move |order_id| {
                    info!(%order_id, "Confirm complete");
                    tracker.record(order_id)?;
                    Ok(())
                })
            })
            .collect();

        let coordinator = {
            let tracker = tracker.clone();
            self.orchestrator.supply(async move { tracker.wait().await })
        };
        let stop_waiting = coordinator.abort_handle();

        let units = self.orchestrator.all_of(units).join();
        let waiting = coordinator.join();
        tokio::pin!(units);
        tokio::pin!(waiting);

        // A failed unit never records, so watch the units as well as the tracker
        let confirmed = tokio::select! {
            count = &mut waiting => {
                (&mut units).await.context("Confirmation unit failed")?;
                count?
            }
            outcome = &mut units => {
                if let Err(e) = outcome {
                    // The tracker can no longer fill up
                    stop_waiting.abort();
                    return Err(e).context("Confirmation unit failed");
                }
                waiting.await?
            }
        };

        info!(confirmed, "All orders confirmed");
        Ok(confirmed)
    }

    /// Confirm every order, then push a notification for each.
    ///
    /// The report lists the orders whose push still failed after the retry
    /// budget was spent.
    #[instrument(skip(self))]
    pub async fn confirm_and_notify(&self, count: usize) -> Result<WorkflowReport> {
        let mut report = WorkflowReport::new(count);

        let units: Vec<(String, TaskHandle<PushMessageResult>)> = self
            .ids
            .create_order_batch(count)
            .into_iter()
            .map(|order| {
                let order_id = order.order_id.clone();
                let orchestrator = self.orchestrator.clone();
                let endpoint = self.endpoint.clone();
                let policy = self.push_policy.clone();

                let unit = self
                    .spawn_confirm(order)
                    .and_then(move |confirmed_id| {
                        orchestrator.supply(async move {
                            send_push_with_retry(endpoint.as_ref(), &confirmed_id, &policy).await
                        })
                    })
                    .when_complete(|outcome| {
                        if let Err(e) = outcome {
                            error!(error = %e, "Order unit failed");
                        }
                    });

                (order_id, unit)
            })
            .collect();

        for (order_id, unit) in units {
            match unit.join().await {
                Ok(result) => report.record_push(result),
                Err(e) => report.record_failure(order_id, e.to_string()),
            }
        }

        report.finish();
        info!(
            run_id = %report.run_id,
            confirmed = report.confirmed,
            failed_pushes = report.failed_pushes.len(),
            "Confirm and notify finished"
        );
        Ok(report)
    }

    /// Create an order, then confirm it once it exists
    #[instrument(skip(self))]
    pub async fn create_and_confirm(&self) -> Result<String> {
        let ids = self.ids.clone();
        let endpoint = self.endpoint.clone();
        let policy = self.confirm_policy.clone();
        let orchestrator = self.orchestrator.clone();

        let order_id = self
            .orchestrator
            .supply(async move { ids.create_order() })
            .and_then(move |order| {
                orchestrator.try_supply(async move {
                    anyhow::Ok(confirm_order(endpoint.as_ref(), &order, &policy).await?)
                })
            })
            .join()
            .await?;

        info!(%order_id, "Created and confirmed");
        Ok(order_id)
    }

    /// Look up item and shipping details in parallel and combine them
    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    pub async fn combine_item_and_shipping(&self, order: &Order) -> Result<String> {
        let item = self.orchestrator.supply(lookup_item(
            order.item_id.clone(),
            Duration::from_millis(self.lookups.item_delay_ms),
        ));
        let shipping = self.orchestrator.supply(lookup_shipping(
            order.address.clone(),
            Duration::from_millis(self.lookups.shipping_delay_ms),
        ));

        let summary = item.combine(shipping, complete_order).join().await?;
        info!(%summary, "Order details combined");
        Ok(summary)
    }

    /// Confirm a batch and collect every identifier, in submission order
    #[instrument(skip(self))]
    pub async fn confirm_all(&self, count: usize) -> Result<Vec<String>> {
        let units: Vec<_> = self
            .ids
            .create_order_batch(count)
            .into_iter()
            .map(|order| self.spawn_confirm(order))
            .collect();

        Ok(self.orchestrator.all_of(units).join().await?)
    }

    /// Confirm a batch and return whichever confirmation lands first.
    ///
    /// The other confirmations are joined before returning.
    #[instrument(skip(self))]
    pub async fn confirm_any(&self, count: usize) -> Result<String> {
        let units: Vec<_> = self
            .ids
            .create_order_batch(count)
            .into_iter()
            .map(|order| self.spawn_confirm(order))
            .collect();

        let race = self.orchestrator.race(units).join().await?;
        let remaining = race.pending.len();
        if let Ok(order_id) = &race.first {
            info!(%order_id, remaining, "First confirmation landed");
        }

        if let Err(e) = self.orchestrator.all_of(race.pending).join().await {
            warn!(error = %e, "Confirmation failed after the first one landed");
        }

        Ok(race.first?)
    }

    /// Recover from a failing stage with `handle`: either outcome becomes a string
    #[instrument(skip(self))]
    pub async fn recover_with_handle(&self, fail: bool) -> Result<String> {
        let ids = self.ids.clone();

        let value = self
            .orchestrator
            .supply(async move { ids.create_order() })
            .try_map(move |order| confirm_unless_rejected(order, fail))
            .handle(|outcome| match outcome {
                Ok(order_id) => order_id,
                Err(e) => e.to_string(),
            })
            .join()
            .await?;

        Ok(value)
    }

    /// Recover from a failing stage with `recover`: only the failure is replaced
    #[instrument(skip(self))]
    pub async fn recover_exceptionally(&self, fail: bool) -> Result<String> {
        let ids = self.ids.clone();

        let value = self
            .orchestrator
            .supply(async move { ids.create_order() })
            .try_map(move |order| confirm_unless_rejected(order, fail))
            .recover(|e| e.to_string())
            .join()
            .await?;

        Ok(value)
    }
}

/// Confirm `order` unless asked to reject it
pub fn confirm_unless_rejected(order: Order, reject: bool) -> Result<String> {
    if reject {
        anyhow::bail!(REJECTION_MESSAGE);
    }
    Ok(order.order_id)
}

/// Simulated item lookup
pub async fn lookup_item(item_id: String, delay: Duration) -> String {
    sleep(delay).await;
    info!(%item_id, "Item info loaded");
    item_id
}

/// Simulated shipping lookup
pub async fn lookup_shipping(address: String, delay: Duration) -> String {
    sleep(delay).await;
    info!(%address, "Shipping info loaded");
    address
}

/// Summary line for an order's item and shipping details
pub fn complete_order(item_id: String, address: String) -> String {
    format!("item = {}, address = {}", item_id, address)
}
