//! Deterministic endpoint for tests and dry runs.
//!
//! Each call is counted per order identifier; a call succeeds once the
//! count for that order reaches the configured attempt.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::RemoteEndpoint;
use crate::domain::{Order, OrderResponse};

/// Endpoint that succeeds on a fixed attempt number (or never)
#[derive(Debug)]
pub struct ScriptedEndpoint {
    /// Attempt on which `send_order` confirms (`None` = never)
    confirm_on: Option<u32>,

    /// Attempt on which `send_push_message` is delivered (`None` = never)
    push_on: Option<u32>,

    confirm_calls: Mutex<HashMap<String, u32>>,
    push_calls: Mutex<HashMap<String, u32>>,
}

impl Default for ScriptedEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEndpoint {
    /// Endpoint where every call succeeds on the first attempt
    pub fn new() -> Self {
        Self {
            confirm_on: Some(1),
            push_on: Some(1),
            confirm_calls: Mutex::new(HashMap::new()),
            push_calls: Mutex::new(HashMap::new()),
        }
    }

    /// Confirm on the given attempt (`None` = never)
    pub fn confirm_on(mut self, attempt: Option<u32>) -> Self {
        self.confirm_on = attempt;
        self
    }

    /// Deliver pushes on the given attempt (`None` = never)
    pub fn push_on(mut self, attempt: Option<u32>) -> Self {
        self.push_on = attempt;
        self
    }

    /// Number of `send_order` calls made for an order
    pub fn confirm_calls(&self, order_id: &str) -> u32 {
        Self::count(&self.confirm_calls, order_id)
    }

    /// Number of `send_push_message` calls made for an order
    pub fn push_calls(&self, order_id: &str) -> u32 {
        Self::count(&self.push_calls, order_id)
    }

    /// Number of `send_push_message` calls across all orders
    pub fn total_push_calls(&self) -> u32 {
        lock(&self.push_calls).values().sum()
    }

    fn count(calls: &Mutex<HashMap<String, u32>>, order_id: &str) -> u32 {
        lock(calls).get(order_id).copied().unwrap_or(0)
    }

    fn bump(calls: &Mutex<HashMap<String, u32>>, order_id: &str) -> u32 {
        let mut calls = lock(calls);
        let attempt = calls.entry(order_id.to_string()).or_insert(0);
        *attempt += 1;
        *attempt
    }

    fn succeeds(target: Option<u32>, attempt: u32) -> bool {
        target.is_some_and(|target| attempt >= target)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // A poisoned lock still holds valid counts
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RemoteEndpoint for ScriptedEndpoint {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send_order(&self, order: &Order) -> OrderResponse {
        let attempt = Self::bump(&self.confirm_calls, &order.order_id);
        if Self::succeeds(self.confirm_on, attempt) {
            OrderResponse::confirmed(order.order_id.clone())
        } else {
            OrderResponse::rejected(Some(format!("attempt-{}", attempt)))
        }
    }

    async fn send_push_message(&self, order_id: &str) -> bool {
        let attempt = Self::bump(&self.push_calls, order_id);
        Self::succeeds(self.push_on, attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_succeeds_on_configured_attempt() {
        let endpoint = ScriptedEndpoint::new().push_on(Some(2));

        assert!(!endpoint.send_push_message("OD-1").await);
        assert!(endpoint.send_push_message("OD-1").await);
        assert_eq!(endpoint.push_calls("OD-1"), 2);
        assert_eq!(endpoint.push_calls("OD-2"), 0);
    }

    #[tokio::test]
    async fn test_never_succeeds() {
        let endpoint = ScriptedEndpoint::new().confirm_on(None);
        let order = Order::new("OD-1", "ITEM", "ADDRESS", 1);

        for _ in 0..5 {
            assert!(!endpoint.send_order(&order).await.success());
        }
        assert_eq!(endpoint.confirm_calls("OD-1"), 5);
    }
}
