//! Nondeterministic endpoint backed by a pseudo-random coin flip.

use async_trait::async_trait;

use super::RemoteEndpoint;
use crate::domain::{Order, OrderResponse};

/// Endpoint whose calls succeed with a fixed probability
#[derive(Debug, Clone)]
pub struct RandomEndpoint {
    /// Probability that `send_order` confirms
    confirm_success_rate: f64,

    /// Probability that `send_push_message` is delivered
    push_success_rate: f64,
}

impl Default for RandomEndpoint {
    fn default() -> Self {
        Self::new(1.0, 0.5)
    }
}

impl RandomEndpoint {
    /// Create an endpoint with the given success probabilities (clamped to `0.0..=1.0`)
    pub fn new(confirm_success_rate: f64, push_success_rate: f64) -> Self {
        Self {
            confirm_success_rate: confirm_success_rate.clamp(0.0, 1.0),
            push_success_rate: push_success_rate.clamp(0.0, 1.0),
        }
    }

    fn flip(rate: f64) -> bool {
        rand::random::<f64>() < rate
    }
}

#[async_trait]
impl RemoteEndpoint for RandomEndpoint {
    fn name(&self) -> &str {
        "random"
    }

    async fn send_order(&self, order: &Order) -> OrderResponse {
        let success = Self::flip(self.confirm_success_rate);
        tracing::debug!(order_id = %order.order_id, success, "Order sent");
        if success {
            OrderResponse::confirmed(order.order_id.clone())
        } else {
            OrderResponse::rejected(None)
        }
    }

    async fn send_push_message(&self, order_id: &str) -> bool {
        let success = Self::flip(self.push_success_rate);
        tracing::debug!(order_id, success, "Push message sent");
        success
    }
}
