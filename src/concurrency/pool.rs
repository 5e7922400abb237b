//! Generic bounded worker pool
//!
//! Work units are blocking closures run on tokio's blocking pool, at most
//! `workers` at a time. Results come back in submission order.

use crate::concurrency::context::ExecContext;
use crate::config::PoolConfig;
use crate::error::{panic_message, Result, TreeError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, warn};

/// Bounded-concurrency executor for independent work units
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Create a pool running at most `workers` units at once
    ///
    /// A budget of 0 defaults to the number of logical CPUs.
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            num_cpus::get().max(1)
        } else {
            workers
        };
        Self { workers }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every work unit and collect one result per unit, in submission order
    ///
    /// A unit that panics yields `WorkerPanic` in its own slot. When `ctx` is
    /// canceled or expires, no further units start and the call returns the
    /// context error instead of partial results.
    pub async fn execute<T, F>(&self, ctx: &ExecContext, work: Vec<F>) -> Result<Vec<Result<T>>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        ctx.check()?;
        let total = work.len();
        let semaphore = Arc::new(Semaphore::new(self.workers));

        let handles: Vec<_> = work
            .into_iter()
            .enumerate()
            .map(|(unit, job)| {
                let semaphore = Arc::clone(&semaphore);
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| TreeError::Canceled)?;
                    // Stop dispatching once the context is done
                    ctx.check()?;
                    tokio::task::spawn_blocking(job)
                        .await
                        .unwrap_or_else(|e| Err(unit_join_error(unit, e)))
                })
            })
            .collect();

        let joined = futures::future::join_all(handles);
        let results = tokio::select! {
            biased;
            results = joined => results,
            err = ctx.done() => {
                warn!(total, error = %err, "Worker pool interrupted");
                return Err(err);
            }
        };

        let results: Vec<Result<T>> = results
            .into_iter()
            .enumerate()
            .map(|(unit, joined)| joined.unwrap_or_else(|e| Err(unit_join_error(unit, e))))
            .collect();

        if let Some(err) = ctx.err() {
            if results
                .iter()
                .any(|r| matches!(r, Err(e) if e.is_cancellation()))
            {
                return Err(err);
            }
        }

        debug!(
            total,
            failed = results.iter().filter(|r| r.is_err()).count(),
            workers = self.workers,
            "Worker pool batch completed"
        );
        Ok(results)
    }

    /// Apply `f` to every item, results matched to items by position
    pub async fn map<I, T, F>(&self, ctx: &ExecContext, items: Vec<I>, f: F) -> Result<Vec<Result<T>>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Result<T> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let work: Vec<_> = items
            .into_iter()
            .map(|item| {
                let f = Arc::clone(&f);
                move || f(item)
            })
            .collect();
        self.execute(ctx, work).await
    }

    /// Run side-effecting work units, returning only the failures with their unit index
    pub async fn each<F>(&self, ctx: &ExecContext, work: Vec<F>) -> Result<Vec<(usize, TreeError)>>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let results = self.execute(ctx, work).await?;
        Ok(results
            .into_iter()
            .enumerate()
            .filter_map(|(unit, result)| result.err().map(|e| (unit, e)))
            .collect())
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(0)
    }
}

fn unit_join_error(unit: usize, err: JoinError) -> TreeError {
    if err.is_panic() {
        TreeError::WorkerPanic {
            unit,
            message: panic_message(&*err.into_panic()),
        }
    } else {
        TreeError::Canceled
    }
}
