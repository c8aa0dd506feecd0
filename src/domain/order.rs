//! Orders and order identifier generation.
//!
//! Orders are immutable values: created once by the workflow driver,
//! handed to the confirm/notify units, and dropped when their unit finishes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Status given to every freshly created order
pub const STATUS_READY: &str = "READY";

/// Process-wide generator backing [`create_order`] and [`create_order_batch`]
static ORDER_IDS: OrderIdGenerator = OrderIdGenerator::new();

/// An order waiting to be confirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier (`OD-<n>`)
    pub order_id: String,

    /// Informational status, not enforced as a state machine
    pub status: String,

    /// Ordered item
    pub item_id: String,

    /// Shipping address
    pub address: String,

    /// Number of items
    pub quantity: u32,
}

impl Order {
    /// Create a new order in the `READY` status
    pub fn new(
        order_id: impl Into<String>,
        item_id: impl Into<String>,
        address: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            status: STATUS_READY.to_string(),
            item_id: item_id.into(),
            address: address.into(),
            quantity,
        }
    }
}

/// Hands out `OD-<n>` identifiers that never repeat for the lifetime of the generator.
#[derive(Debug)]
pub struct OrderIdGenerator {
    next: AtomicU64,
}

impl Default for OrderIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderIdGenerator {
    /// Create a generator starting at `OD-0`
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Next unused identifier
    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("OD-{}", n)
    }

    /// Create a single order with placeholder item and address
    pub fn create_order(&self) -> Order {
        let order = Order::new(self.next_id(), "ITEM", "ADDRESS", 1);
        tracing::debug!(order_id = %order.order_id, "Created order");
        order
    }

    /// Create `count` orders; the i-th gets item `ITEM-i` and address `addr i`
    pub fn create_order_batch(&self, count: usize) -> Vec<Order> {
        (0..count)
            .map(|i| {
                let order = Order::new(
                    self.next_id(),
                    format!("ITEM-{}", i),
                    format!("addr {}", i),
                    1,
                );
                tracing::debug!(order_id = %order.order_id, "Created order");
                order
            })
            .collect()
    }
}

/// Create a single order using the process-wide generator
pub fn create_order() -> Order {
    ORDER_IDS.create_order()
}

/// Create a batch of orders using the process-wide generator
pub fn create_order_batch(count: usize) -> Vec<Order> {
    ORDER_IDS.create_order_batch(count)
}
