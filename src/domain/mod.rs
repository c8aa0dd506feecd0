//! Domain types for the order pipeline.
//!
//! This module contains the core data structures:
//! - Order: immutable order values and identifier generation
//! - Responses: results of confirm and push calls
//! - Report: summary of a confirm-and-notify run

pub mod order;
pub mod report;
pub mod response;

// Re-export commonly used types
pub use order::{create_order, create_order_batch, Order, OrderIdGenerator};
pub use report::{UnitFailure, WorkflowReport};
pub use response::{OrderResponse, PushMessageResult};
