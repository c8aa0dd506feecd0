//! orderflow - Asynchronous order pipeline
//!
//! Creates orders, confirms them against a remote endpoint with retries,
//! sends push notifications, and coordinates the units of work on an
//! explicitly sized worker pool.
//!
//! # Architecture
//!
//! - Every remote call goes through a retry loop with a fixed interval
//! - Units of work are chained with combinators on [`TaskHandle`]
//! - A [`CompletionTracker`] lets a coordinator wait for a known number of units
//!
//! # Modules
//!
//! - `adapters`: Remote endpoint implementations (random, scripted)
//! - `core`: Retry loops, orchestrator, task combinators, tracker, workflow
//! - `domain`: Data structures (Order, OrderResponse, WorkflowReport)
//! - `config`: Configuration loading
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Confirm and notify 100 orders, listing failed pushes
//! orderflow notify
//!
//! # Parallel item and shipping lookups
//! orderflow combine
//!
//! # Recover from a failing stage
//! orderflow recover --style exceptionally --fail
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{RandomEndpoint, RemoteEndpoint, ScriptedEndpoint};
pub use crate::core::{
    CompletionTracker, Orchestrator, OrderWorkflow, RetryPolicy, TaskError, TaskHandle,
};
pub use domain::{Order, OrderResponse, PushMessageResult, WorkflowReport};
