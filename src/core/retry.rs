//! Retry loops for the remote order endpoints.
//!
//! Two budgets are used:
//! - confirmation retries at a fixed interval with no attempt cap, since a
//!   confirmed order is assumed to be always reachable eventually
//! - push notification retries a fixed number of times and reports the
//!   last outcome, since delivery is best-effort
//!
//! An unsuccessful call is data, not an error: the loop itself never fails.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::adapters::RemoteEndpoint;
use crate::domain::{Order, PushMessageResult};

/// Fixed-interval retry budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts including the first (`None` = unbounded)
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Delay between attempts in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    100
}

/// Whole milliseconds in `interval`, saturating at `u64::MAX`
fn whole_millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::confirm_default()
    }
}

impl RetryPolicy {
    /// Retry until success, with no attempt cap
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            max_attempts: None,
            interval_ms: whole_millis(interval),
        }
    }

    /// Retry at most `max_attempts` times (at least one attempt is always made)
    pub fn bounded(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            interval_ms: whole_millis(interval),
        }
    }

    /// Order confirmation: unbounded, 100ms apart
    pub fn confirm_default() -> Self {
        Self::unbounded(Duration::from_millis(default_interval_ms()))
    }

    /// Push notification: 3 attempts, 100ms apart
    pub fn push_default() -> Self {
        Self::bounded(3, Duration::from_millis(default_interval_ms()))
    }

    /// Delay between attempts
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Check if another attempt is allowed after `attempt` (1-indexed) failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    pub fn is_bounded(&self) -> bool {
        self.max_attempts.is_some()
    }
}

/// Result of a retry loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome<T> {
    /// Value produced by the last attempt
    pub value: T,

    /// Number of attempts made
    pub attempts: u32,

    /// Whether the last attempt counted as a success
    pub succeeded: bool,
}

/// Confirmation ran out of its (optional) attempt budget
#[derive(Debug, Clone, Error)]
#[error("order {order_id} not confirmed after {attempts} attempts")]
pub struct RetryExhausted {
    pub order_id: String,
    pub attempts: u32,
}

/// Invoke `operation` until `is_success` accepts its value or the policy gives up.
///
/// Sleeps `policy.interval()` between attempts, never after the last one.
/// The sleep suspends only the calling task.
pub async fn retry_until<F, Fut, T, P>(
    policy: &RetryPolicy,
    mut operation: F,
    is_success: P,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = T>,
    P: Fn(&T) -> bool,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let value = operation(attempt).await;

        if is_success(&value) {
            if attempt > 1 {
                debug!(attempt, "Operation succeeded after retry");
            }
            return RetryOutcome {
                value,
                attempts: attempt,
                succeeded: true,
            };
        }

        if !policy.should_retry(attempt) {
            return RetryOutcome {
                value,
                attempts: attempt,
                succeeded: false,
            };
        }

        debug!(
            attempt,
            max_attempts = ?policy.max_attempts,
            delay_ms = policy.interval_ms,
            "Attempt unsuccessful, retrying after delay"
        );

        sleep(policy.interval()).await;
    }
}

/// Send an order until it is confirmed.
///
/// Returns the confirmed order identifier. A response only counts as a
/// confirmation when it carries this order's identifier. With an unbounded
/// policy this never returns `Err`, and never returns at all if the
/// endpoint never confirms.
pub async fn confirm_order(
    endpoint: &dyn RemoteEndpoint,
    order: &Order,
    policy: &RetryPolicy,
) -> Result<String, RetryExhausted> {
    let outcome = retry_until(
        policy,
        |attempt| {
            debug!(order_id = %order.order_id, attempt, "Sending order");
            endpoint.send_order(order)
        },
        |response| response.confirms(&order.order_id).is_some(),
    )
    .await;

    if outcome.succeeded {
        info!(
            order_id = %order.order_id,
            attempts = outcome.attempts,
            "Order confirmed"
        );
        Ok(order.order_id.clone())
    } else {
        warn!(
            order_id = %order.order_id,
            attempts = outcome.attempts,
            error_code = ?outcome.value.error_code(),
            "Order confirmation budget exhausted"
        );
        Err(RetryExhausted {
            order_id: order.order_id.clone(),
            attempts: outcome.attempts,
        })
    }
}

/// Send a push notification, retrying per `policy`.
///
/// Always returns a result: exhausting the budget yields `success = false`.
pub async fn send_push_with_retry(
    endpoint: &dyn RemoteEndpoint,
    order_id: &str,
    policy: &RetryPolicy,
) -> PushMessageResult {
    let outcome = retry_until(
        policy,
        |attempt| {
            debug!(order_id, attempt, "Sending push message");
            endpoint.send_push_message(order_id)
        },
        |delivered| *delivered,
    )
    .await;

    if outcome.succeeded {
        info!(order_id, attempts = outcome.attempts, "Push message delivered");
    } else {
        warn!(
            order_id,
            attempts = outcome.attempts,
            "Push message failed after all retries"
        );
    }

    PushMessageResult {
        order_id: order_id.to_string(),
        success: outcome.value,
        attempts: outcome.attempts,
    }
}
