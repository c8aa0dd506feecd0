//! Task handles and the combinators that compose them.
//!
//! A [`TaskHandle`] is a unit of work already running on the orchestrator's
//! worker pool plus a reference to its eventual outcome. Every combinator
//! spawns the continuation onto the same pool and returns immediately; only
//! [`TaskHandle::join`] (and [`TaskHandle::wait`]) ever block the caller.
//!
//! Failures travel down a chain untouched: `map`, `try_map`, `accept`,
//! `and_then` and `combine` are skipped once an upstream stage failed, until
//! `handle` or `recover` turns the failure back into a value.

use std::any::Any;
use std::future::Future;

use futures_util::future::{join_all, select_all};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tracing::debug;

/// Why a task produced no value
#[derive(Debug, Error)]
pub enum TaskError {
    /// A stage returned an error
    #[error(transparent)]
    Fault(#[from] anyhow::Error),

    /// A stage panicked
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was cancelled before it finished (e.g. while sleeping)
    #[error("task interrupted")]
    Interrupted,

    /// `any_of` was given nothing to wait for
    #[error("no tasks to wait for")]
    Empty,
}

impl TaskError {
    fn from_join(err: JoinError) -> Self {
        if err.is_cancelled() {
            return Self::Interrupted;
        }
        match err.try_into_panic() {
            Ok(payload) => Self::Panicked(panic_message(payload)),
            Err(_) => Self::Interrupted,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Handle to a unit of work running on a worker pool
#[derive(Debug)]
pub struct TaskHandle<T> {
    inner: JoinHandle<Result<T, TaskError>>,
    runtime: Handle,
}

/// Spawn `future` on `runtime` and track its outcome
pub(crate) fn spawn_on<T, F>(runtime: &Handle, future: F) -> TaskHandle<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T, TaskError>> + Send + 'static,
{
    TaskHandle {
        inner: runtime.spawn(future),
        runtime: runtime.clone(),
    }
}

impl<T: Send + 'static> TaskHandle<T> {
    /// Wait for the outcome of this task
    pub async fn join(self) -> Result<T, TaskError> {
        match self.inner.await {
            Ok(outcome) => outcome,
            Err(err) => Err(TaskError::from_join(err)),
        }
    }

    /// Block the current thread until the task finishes.
    ///
    /// Must be called from outside any async context (it drives the pool's
    /// runtime handle directly); use [`TaskHandle::join`] inside async code.
    pub fn wait(self) -> Result<T, TaskError> {
        let runtime = self.runtime.clone();
        runtime.block_on(self.join())
    }

    /// Whether the task has finished (successfully or not)
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Cancel the task; joining it afterwards yields [`TaskError::Interrupted`]
    pub fn abort(&self) {
        self.inner.abort();
    }

    /// A handle that can cancel the task after this one has been consumed
    pub fn abort_handle(&self) -> AbortHandle {
        self.inner.abort_handle()
    }

    fn continue_with<U, F, Fut>(self, continuation: F) -> TaskHandle<U>
    where
        U: Send + 'static,
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<U, TaskError>> + Send + 'static,
    {
        let runtime = self.runtime.clone();
        spawn_on(&runtime, continuation(self))
    }

    /// Transform the value once it is available
    pub fn map<U, F>(self, f: F) -> TaskHandle<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.continue_with(|upstream| async move { upstream.join().await.map(f) })
    }

    /// Transform the value with a stage that may fail
    pub fn try_map<U, F>(self, f: F) -> TaskHandle<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> anyhow::Result<U> + Send + 'static,
    {
        self.continue_with(|upstream| async move {
            let value = upstream.join().await?;
            f(value).map_err(TaskError::Fault)
        })
    }

    /// Consume the value for its side effect
    pub fn accept<F>(self, f: F) -> TaskHandle<()>
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.map(f)
    }

    /// Chain a stage that itself starts another task, flattening the result
    pub fn and_then<U, F>(self, f: F) -> TaskHandle<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> TaskHandle<U> + Send + 'static,
    {
        self.continue_with(|upstream| async move {
            let value = upstream.join().await?;
            f(value).join().await
        })
    }

    /// Wait for this task and an independent one, then combine both values
    pub fn combine<U, V, F>(self, other: TaskHandle<U>, f: F) -> TaskHandle<V>
    where
        U: Send + 'static,
        V: Send + 'static,
        F: FnOnce(T, U) -> V + Send + 'static,
    {
        self.continue_with(|upstream| async move {
            let (left, right) = tokio::join!(upstream.join(), other.join());
            Ok::<_, TaskError>(f(left?, right?))
        })
    }

    /// Observe the outcome without changing it
    pub fn when_complete<F>(self, f: F) -> TaskHandle<T>
    where
        F: FnOnce(&Result<T, TaskError>) + Send + 'static,
    {
        self.continue_with(|upstream| async move {
            let outcome = upstream.join().await;
            f(&outcome);
            outcome
        })
    }

    /// Turn either outcome into a value; the resulting task always succeeds
    /// (unless `f` itself panics)
    pub fn handle<U, F>(self, f: F) -> TaskHandle<U>
    where
        U: Send + 'static,
        F: FnOnce(Result<T, TaskError>) -> U + Send + 'static,
    {
        self.continue_with(|upstream| async move { Ok(f(upstream.join().await)) })
    }

    /// Replace a failure with a value; a success passes through untouched
    pub fn recover<F>(self, f: F) -> TaskHandle<T>
    where
        F: FnOnce(TaskError) -> T + Send + 'static,
    {
        self.continue_with(|upstream| async move { Ok(upstream.join().await.unwrap_or_else(f)) })
    }
}

/// Complete once every task has completed, with their values in input order.
///
/// If any task failed, the combined task fails with the first failure in
/// input order, but only after all of them have finished.
pub(crate) fn all_of<T>(runtime: &Handle, handles: Vec<TaskHandle<T>>) -> TaskHandle<Vec<T>>
where
    T: Send + 'static,
{
    spawn_on(runtime, async move {
        let total = handles.len();
        let outcomes = join_all(handles.into_iter().map(TaskHandle::join)).await;
        debug!(total, "All tasks completed");
        outcomes.into_iter().collect::<Result<Vec<T>, TaskError>>()
    })
}

/// Outcome of racing several tasks against each other
#[derive(Debug)]
pub struct Race<T> {
    /// Outcome of the first task to complete
    pub first: Result<T, TaskError>,

    /// Position of the winner in the input
    pub index: usize,

    /// The other tasks, still running, in input order
    pub pending: Vec<TaskHandle<T>>,
}

async fn race_members<T>(mut handles: Vec<TaskHandle<T>>) -> Result<Race<T>, TaskError>
where
    T: Send + 'static,
{
    if handles.is_empty() {
        return Err(TaskError::Empty);
    }
    let total = handles.len();

    let (outcome, index, rest) = select_all(handles.iter_mut().map(|h| &mut h.inner)).await;
    drop(rest);

    let first = outcome.unwrap_or_else(|err| Err(TaskError::from_join(err)));
    handles.remove(index);
    debug!(index, total, "First task completed");

    Ok(Race {
        first,
        index,
        pending: handles,
    })
}

/// Complete as soon as any task completes, handing back the ones still running
pub(crate) fn race<T>(runtime: &Handle, handles: Vec<TaskHandle<T>>) -> TaskHandle<Race<T>>
where
    T: Send + 'static,
{
    spawn_on(runtime, race_members(handles))
}

/// Complete as soon as any task completes, with that task's outcome.
///
/// The remaining tasks are detached: they keep running only as long as the
/// pool does. `Orchestrator::race` keeps hold of them instead.
pub(crate) fn any_of<T>(runtime: &Handle, handles: Vec<TaskHandle<T>>) -> TaskHandle<T>
where
    T: Send + 'static,
{
    spawn_on(runtime, async move { race_members(handles).await?.first })
}
