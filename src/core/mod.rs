//! Core orchestration logic.
//!
//! This module contains:
//! - Retry: fixed-interval retry loops for confirmation and push
//! - Task: task handles and their combinators
//! - Orchestrator: worker pool and unit submission
//! - Tracker: completion barrier over a shared set of order identifiers
//! - Workflow: the order pipeline built from the pieces above

pub mod orchestrator;
pub mod retry;
pub mod task;
pub mod tracker;
pub mod workflow;

// Re-export commonly used types
pub use orchestrator::{Orchestrator, WorkerPool};
pub use retry::{
    confirm_order, retry_until, send_push_with_retry, RetryExhausted, RetryOutcome, RetryPolicy,
};
pub use task::{Race, TaskError, TaskHandle};
pub use tracker::{CompletionTracker, TrackerError};
pub use workflow::OrderWorkflow;
