//! Task orchestrator and its worker pool.
//!
//! The orchestrator owns an explicitly sized pool of worker threads. Every
//! unit of work and every continuation chained onto it runs on that pool;
//! nothing is scheduled on an implicit global executor.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info};

use super::task::{self, spawn_on, Race, TaskError, TaskHandle};
use crate::config::ResolvedConfig;

/// Name prefix for worker threads
pub const WORKER_THREAD_PREFIX: &str = "orderflow-worker";

/// A dedicated multi-threaded runtime
#[derive(Debug)]
pub struct WorkerPool {
    /// Owned runtime (taken on drop)
    runtime: Option<Runtime>,

    /// Handle used to spawn onto the runtime
    handle: Handle,

    /// Number of worker threads
    workers: usize,
}

impl WorkerPool {
    /// Build a pool with `workers` threads (at least one)
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let next_id = Arc::new(AtomicUsize::new(0));

        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name_fn(move || {
                let id = next_id.fetch_add(1, Ordering::Relaxed);
                format!("{}-{}", WORKER_THREAD_PREFIX, id)
            })
            .enable_all()
            .build()
            .with_context(|| format!("Failed to build worker pool with {} threads", workers))?;

        let handle = runtime.handle().clone();
        debug!(workers, "Worker pool started");

        Ok(Self {
            runtime: Some(runtime),
            handle,
            workers,
        })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Non-blocking, so the pool may be dropped from inside another runtime
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Schedules units of work and builds fan-in handles over them.
///
/// Cloning is cheap; clones share the same worker pool, which shuts down
/// once the last clone is dropped.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    pool: Arc<WorkerPool>,
}

impl Orchestrator {
    /// Create an orchestrator with its own pool of `workers` threads
    pub fn new(workers: usize) -> Result<Self> {
        Ok(Self {
            pool: Arc::new(WorkerPool::new(workers)?),
        })
    }

    /// Create an orchestrator sized from configuration
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        info!(workers = config.workers, "Starting orchestrator");
        Self::new(config.workers)
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// Run `future` on the pool without blocking the caller
    pub fn supply<T, F>(&self, future: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        spawn_on(self.pool.handle(), async move { Ok(future.await) })
    }

    /// Run a fallible `future` on the pool; an `Err` fails the handle
    pub fn try_supply<T, F>(&self, future: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        spawn_on(self.pool.handle(), async move {
            future.await.map_err(TaskError::Fault)
        })
    }

    /// A handle that is already complete with `value`
    pub fn completed<T>(&self, value: T) -> TaskHandle<T>
    where
        T: Send + 'static,
    {
        spawn_on(self.pool.handle(), async move { Ok(value) })
    }

    /// Wait for every handle; values come back in input order
    pub fn all_of<T>(&self, handles: Vec<TaskHandle<T>>) -> TaskHandle<Vec<T>>
    where
        T: Send + 'static,
    {
        task::all_of(self.pool.handle(), handles)
    }

    /// Wait for whichever handle completes first
    pub fn any_of<T>(&self, handles: Vec<TaskHandle<T>>) -> TaskHandle<T>
    where
        T: Send + 'static,
    {
        task::any_of(self.pool.handle(), handles)
    }

    /// Wait for whichever handle completes first, keeping the others
    pub fn race<T>(&self, handles: Vec<TaskHandle<T>>) -> TaskHandle<Race<T>>
    where
        T: Send + 'static,
    {
        task::race(self.pool.handle(), handles)
    }

    /// Number of units still alive on the pool
    pub fn alive_units(&self) -> usize {
        self.pool.handle().metrics().num_alive_tasks()
    }

    /// Drive `future` to completion on the pool, blocking the current thread.
    ///
    /// For synchronous callers only; panics if called from an async context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.pool.handle().block_on(future)
    }
}
