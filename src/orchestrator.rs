//! Bounded-concurrency task group.
//!
//! [`TaskGroup::run`] admits work items in submission order through a
//! semaphore with `limit` permits, spawns one tokio task per admitted item and
//! joins every task before returning. The permit travels into the spawned task
//! and is dropped when it ends, so each slot is released exactly once whether
//! the task succeeds, fails or panics.
//!
//! # Nesting
//!
//! The item group runs one media group per entry. An item task keeps its own
//! permit until its media group has drained, so up to `items × media`
//! downloads can be in flight at once. [`crate::config::Settings::validate`]
//! caps that product.

use crate::error::Result;
use futures::FutureExt;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// A task that did not complete, by task id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub id: usize,
    pub error: String,
}

/// Aggregated outcome of one [`TaskGroup::run`].
#[derive(Debug)]
pub struct BatchReport<R> {
    pub submitted: usize,
    /// Outputs of successful tasks, sorted by task id.
    pub completed: Vec<(usize, R)>,
    pub failures: Vec<TaskFailure>,
}

impl<R> BatchReport<R> {
    pub fn succeeded(&self) -> usize {
        self.completed.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Sort by task id and record a failure for every submitted id that has
    /// no outcome, so `succeeded() + failed() == submitted`. A join error
    /// carries no task id, so `lost` messages are handed out in id order.
    fn record_unaccounted(&mut self, lost: Vec<String>) {
        let seen: HashSet<usize> = self
            .completed
            .iter()
            .map(|(id, _)| *id)
            .chain(self.failures.iter().map(|f| f.id))
            .collect();
        let mut lost = lost.into_iter();
        for id in (1..=self.submitted).filter(|id| !seen.contains(id)) {
            let error = lost.next().unwrap_or_else(|| "task did not run".to_string());
            self.failures.push(TaskFailure { id, error });
        }

        self.completed.sort_by_key(|(id, _)| *id);
        self.failures.sort_by_key(|f| f.id);
    }
}

#[derive(Debug, Clone)]
pub struct TaskGroup {
    name: &'static str,
    limit: usize,
}

impl TaskGroup {
    /// A limit of zero is treated as one.
    pub fn new(name: &'static str, limit: usize) -> Self {
        Self { name, limit: limit.max(1) }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run `task` over `items` with at most `limit` tasks in flight.
    ///
    /// Task ids are one-based positions in `items`. Returns once every
    /// spawned task has finished.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, task: F) -> BatchReport<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(usize, T) -> Fut + Send + Sync,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let gate = Arc::new(Semaphore::new(self.limit));
        let mut running = JoinSet::new();
        let mut report = BatchReport {
            submitted: items.len(),
            completed: Vec::new(),
            failures: Vec::new(),
        };

        info!(group = self.name, tasks = report.submitted, limit = self.limit(), "Dispatching tasks");

        for (index, item) in items.into_iter().enumerate() {
            let id = index + 1;
            // The gate is never closed.
            let Ok(permit) = Arc::clone(&gate).acquire_owned().await else {
                break;
            };
            debug!(group = self.name, task = id, "Admitted");

            let work = task(id, item);
            running.spawn(async move {
                let outcome = AssertUnwindSafe(work).catch_unwind().await;
                drop(permit);
                (id, outcome)
            });
        }

        let mut lost = Vec::new();
        while let Some(joined) = running.join_next().await {
            match joined {
                Ok((id, Ok(Ok(output)))) => report.completed.push((id, output)),
                Ok((id, Ok(Err(e)))) => {
                    warn!(group = self.name, task = id, error = %e, "Task failed");
                    report.failures.push(TaskFailure { id, error: e.to_string() });
                }
                Ok((id, Err(panic))) => {
                    let message = panic_message(panic.as_ref());
                    error!(group = self.name, task = id, panic = %message, "Task panicked");
                    report.failures.push(TaskFailure { id, error: format!("panicked: {message}") });
                }
                // Tasks are never aborted, so this only happens if the runtime shuts down.
                Err(e) => {
                    error!(group = self.name, error = %e, "Task could not be joined");
                    lost.push(e.to_string());
                }
            }
        }

        report.record_unaccounted(lost);
        info!(
            group = self.name,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "All tasks finished"
        );
        report
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
