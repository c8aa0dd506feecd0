//! Adapter interfaces for the remote order endpoints.
//!
//! The confirm and push endpoints are stand-ins for remote I/O: every call
//! may succeed or fail, and a failure is reported as data, never as an error.

pub mod random;
pub mod scripted;

use async_trait::async_trait;

use crate::domain::{Order, OrderResponse};

pub use random::RandomEndpoint;
pub use scripted::ScriptedEndpoint;

/// Trait for the remote confirm/push endpoints
#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
    /// Human-readable endpoint name
    fn name(&self) -> &str;

    /// Send an order for confirmation
    async fn send_order(&self, order: &Order) -> OrderResponse;

    /// Send a push notification for a confirmed order
    async fn send_push_message(&self, order_id: &str) -> bool;
}
