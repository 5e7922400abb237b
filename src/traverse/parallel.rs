//! Parallel traversal engine
//!
//! Each directory fans its children out as tokio tasks. Visitor calls run on the
//! blocking pool while holding one per-call slot and one permit from the
//! process-wide gate; neither is held while a parent waits for its children.

use crate::concurrency::context::ExecContext;
use crate::concurrency::gate::traversal_gate;
use crate::error::{panic_message, Result, TreeError};
use crate::traverse::traverser::{
    conclude, ProgressCallback, StateCell, TraversalOptions, TraversalOrder, TraversalStats,
};
use crate::traverse::visitor::NodeVisitor;
use crate::tree::node::Node;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, trace, warn};

pub(crate) struct ParallelRun {
    shared: Arc<RunShared>,
}

struct RunShared {
    ctx: ExecContext,
    visitor: Arc<dyn NodeVisitor>,
    order: TraversalOrder,
    continue_on_error: bool,
    progress: Option<ProgressCallback>,
    limiter: Semaphore,
    gate: Arc<Semaphore>,
    aborted: AtomicBool,
    first_error: Mutex<Option<TreeError>>,
    errors: Mutex<Vec<TreeError>>,
    files: AtomicUsize,
    directories: AtomicUsize,
    state: StateCell,
}

impl ParallelRun {
    pub(crate) fn new(
        ctx: ExecContext,
        visitor: Arc<dyn NodeVisitor>,
        options: &TraversalOptions,
        state: StateCell,
    ) -> Self {
        Self {
            shared: Arc::new(RunShared {
                ctx,
                visitor,
                order: options.order,
                continue_on_error: options.continue_on_error,
                progress: options.progress.clone(),
                limiter: Semaphore::new(options.max_concurrency.max(1)),
                gate: traversal_gate(),
                aborted: AtomicBool::new(false),
                first_error: Mutex::new(None),
                errors: Mutex::new(Vec::new()),
                files: AtomicUsize::new(0),
                directories: AtomicUsize::new(0),
                state,
            }),
        }
    }

    pub(crate) async fn execute(self, root: Arc<Node>) -> Result<TraversalStats> {
        let run = self.shared;
        let task = tokio::spawn(visit_subtree(Arc::clone(&run), Arc::clone(&root), 0));

        let outcome = tokio::select! {
            biased;
            joined = task => joined.unwrap_or_else(|e| Err(join_error(&root, e))),
            err = run.ctx.done() => {
                warn!(error = %err, "Parallel traversal interrupted");
                Err(err)
            }
        };

        if let Some(err) = run.ctx.err() {
            return Err(err);
        }
        if let Some(err) = run.first_error.lock().take() {
            return Err(err);
        }

        let stats = TraversalStats {
            files: run.files.load(Ordering::SeqCst),
            directories: run.directories.load(Ordering::SeqCst),
        };
        let errors = std::mem::take(&mut *run.errors.lock());
        conclude(outcome, errors, stats)
    }
}

fn visit_subtree(run: Arc<RunShared>, node: Arc<Node>, depth: usize) -> BoxFuture<'static, Result<()>> {
    async move {
        if node.name() == "." {
            return Ok(());
        }
        run.proceed()?;

        if !node.is_dir() {
            return run.visit(&node, depth).await;
        }

        match run.order {
            TraversalOrder::PreOrder => {
                run.visit(&node, depth).await?;
                fan_out(&run, &node, depth).await
            }
            // In-order has no meaningful "middle" once siblings run concurrently
            TraversalOrder::PostOrder | TraversalOrder::InOrder => {
                fan_out(&run, &node, depth).await?;
                run.visit(&node, depth).await
            }
        }
    }
    .boxed()
}

async fn fan_out(run: &Arc<RunShared>, node: &Arc<Node>, depth: usize) -> Result<()> {
    let children = node.children();
    let handles: Vec<_> = children
        .iter()
        .map(|child| tokio::spawn(visit_subtree(Arc::clone(run), Arc::clone(child), depth + 1)))
        .collect();

    let mut outcome = Ok(());
    for (child, joined) in children.iter().zip(futures::future::join_all(handles).await) {
        let result = match joined {
            Ok(result) => result,
            Err(e) => run.handle_error(join_error(child, e)),
        };
        if let Err(e) = result {
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }
    }
    outcome
}

impl RunShared {
    /// Err once the context is done or a fail-fast error has been recorded
    fn proceed(&self) -> Result<()> {
        self.ctx.check()?;
        if self.aborted.load(Ordering::SeqCst) {
            return Err(TreeError::Canceled);
        }
        Ok(())
    }

    async fn visit(&self, node: &Arc<Node>, depth: usize) -> Result<()> {
        let _slot = self.limiter.acquire().await.map_err(|_| TreeError::Canceled)?;
        let _permit = self.gate.acquire().await.map_err(|_| TreeError::Canceled)?;
        self.proceed()?;
        self.state.visiting(depth);
        trace!(path = %node.path(), depth, "Visiting node");

        let visitor = Arc::clone(&self.visitor);
        let target = Arc::clone(node);
        let joined = tokio::task::spawn_blocking(move || {
            if target.is_dir() {
                visitor.visit_directory(&target, depth)
            } else {
                visitor.visit_file(&target, depth)
            }
        })
        .await;

        let result = joined.unwrap_or_else(|e| Err(join_error(node, e)));
        match result {
            Ok(()) if node.is_dir() => {
                self.directories.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Ok(()) => {
                let count = self.files.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = &self.progress {
                    if self.ctx.err().is_none() {
                        progress(count, &node.path());
                    }
                }
                Ok(())
            }
            Err(e) => self.handle_error(e),
        }
    }

    fn handle_error(&self, err: TreeError) -> Result<()> {
        if err.is_cancellation() {
            return Err(err);
        }
        if self.continue_on_error {
            debug!(error = %err, "Visitor error, continuing");
            self.errors.lock().push(err);
            return Ok(());
        }

        self.aborted.store(true, Ordering::SeqCst);
        let mut first = self.first_error.lock();
        if first.is_none() {
            debug!(error = %err, "Visitor error, stopping traversal");
            *first = Some(err);
        }
        // The recorded first error is what the caller sees
        Err(TreeError::Canceled)
    }
}

fn join_error(node: &Arc<Node>, err: JoinError) -> TreeError {
    if err.is_panic() {
        TreeError::TraversalPanic {
            path: node.path(),
            name: node.name().to_string(),
            message: panic_message(&*err.into_panic()),
        }
    } else {
        TreeError::Canceled
    }
}
