//! Tree traverser: visit order, options and the sequential engine

use crate::concurrency::context::ExecContext;
use crate::config::TraversalConfig;
use crate::error::{panic_message, Result, TreeError};
use crate::traverse::parallel::ParallelRun;
use crate::traverse::visitor::NodeVisitor;
use crate::tree::node::Node;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, trace};

/// Default per-traversal concurrency ceiling
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Position of a node's visit relative to its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalOrder {
    /// Node before its children
    #[default]
    PreOrder,
    /// Node after its children
    PostOrder,
    /// Left half of the sorted children, the node, then the right half
    InOrder,
}

/// Called once per visited file with the running file count and the file path
pub type ProgressCallback = Arc<dyn Fn(usize, &str) + Send + Sync>;

/// Traversal options
#[derive(Clone)]
pub struct TraversalOptions {
    pub order: TraversalOrder,
    /// Visitor calls allowed in flight at once (parallel mode)
    pub max_concurrency: usize,
    /// Overall time budget for one call
    pub timeout: Option<Duration>,
    /// Collect visitor errors and keep going instead of stopping at the first
    pub continue_on_error: bool,
    pub progress: Option<ProgressCallback>,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            order: TraversalOrder::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout: None,
            continue_on_error: false,
            progress: None,
        }
    }
}

impl TraversalOptions {
    pub fn from_config(config: &TraversalConfig) -> Self {
        Self {
            order: config.order,
            max_concurrency: config.max_concurrency.max(1),
            timeout: config.timeout_ms.map(Duration::from_millis),
            continue_on_error: config.continue_on_error,
            progress: None,
        }
    }

    pub fn with_order(mut self, order: TraversalOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, progress: impl Fn(usize, &str) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }
}

impl fmt::Debug for TraversalOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalOptions")
            .field("order", &self.order)
            .field("max_concurrency", &self.max_concurrency)
            .field("timeout", &self.timeout)
            .field("continue_on_error", &self.continue_on_error)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Lifecycle of one traversal call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    Init,
    Visiting { depth: usize },
    Done,
    Failed,
    TimedOut,
    Canceled,
}

impl TraversalState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TraversalState::Init | TraversalState::Visiting { .. })
    }
}

/// Shared cell recording the state of the running (or last) traversal
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<Mutex<TraversalState>>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(TraversalState::Init)))
    }

    pub(crate) fn get(&self) -> TraversalState {
        *self.0.lock()
    }

    pub(crate) fn reset(&self) {
        *self.0.lock() = TraversalState::Init;
    }

    pub(crate) fn visiting(&self, depth: usize) {
        let mut state = self.0.lock();
        if !state.is_terminal() {
            *state = TraversalState::Visiting { depth };
        }
    }

    /// Move to the terminal state matching `result`; only the first call counts
    pub(crate) fn finish(&self, result: &Result<TraversalStats>) -> TraversalState {
        let mut state = self.0.lock();
        if !state.is_terminal() {
            *state = match result {
                Ok(_) => TraversalState::Done,
                Err(TreeError::TimedOut) => TraversalState::TimedOut,
                Err(TreeError::Canceled) => TraversalState::Canceled,
                Err(_) => TraversalState::Failed,
            };
        }
        *state
    }
}

/// Counts of nodes visited by a successful traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub files: usize,
    pub directories: usize,
}

/// Visitor-driven traversal over a node subtree
#[derive(Debug, Clone)]
pub struct TreeTraverser {
    options: TraversalOptions,
    state: StateCell,
}

impl TreeTraverser {
    pub fn new(options: TraversalOptions) -> Self {
        Self {
            options,
            state: StateCell::new(),
        }
    }

    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    /// State of the most recent traversal started by this traverser
    pub fn state(&self) -> TraversalState {
        self.state.get()
    }

    fn scoped(&self, ctx: &ExecContext) -> ExecContext {
        match self.options.timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        }
    }

    /// Visit the subtree sequentially, children in name order
    #[instrument(skip(self, ctx, root, visitor), fields(root = %root.path(), order = ?self.options.order))]
    pub fn traverse(
        &self,
        ctx: &ExecContext,
        root: &Arc<Node>,
        visitor: &dyn NodeVisitor,
    ) -> Result<TraversalStats> {
        let ctx = self.scoped(ctx);
        self.state.reset();

        let mut run = SequentialRun {
            ctx: &ctx,
            visitor,
            options: &self.options,
            state: &self.state,
            stats: TraversalStats::default(),
            errors: Vec::new(),
        };
        let outcome = run.walk(root, 0);
        let (stats, errors) = (run.stats, run.errors);

        let result = conclude(outcome, errors, stats);
        let state = self.state.finish(&result);
        debug!(?state, files = stats.files, directories = stats.directories, "Sequential traversal finished");
        result
    }

    /// Visit the subtree with concurrent child tasks
    ///
    /// Sibling order is not guaranteed. Post-order and in-order visits wait for
    /// every child task before visiting the parent; pre-order visits the parent
    /// first. A panic in a visitor becomes a `TraversalPanic` error.
    #[instrument(skip(self, ctx, root, visitor), fields(root = %root.path(), order = ?self.options.order))]
    pub async fn traverse_parallel(
        &self,
        ctx: &ExecContext,
        root: Arc<Node>,
        visitor: Arc<dyn NodeVisitor>,
    ) -> Result<TraversalStats> {
        let ctx = self.scoped(ctx);
        self.state.reset();

        let run = ParallelRun::new(ctx, visitor, &self.options, self.state.clone());
        let result = run.execute(root).await;
        let state = self.state.finish(&result);
        debug!(?state, "Parallel traversal finished");
        result
    }
}

impl Default for TreeTraverser {
    fn default() -> Self {
        Self::new(TraversalOptions::default())
    }
}

/// Fold the walk outcome and accumulated errors into the call result
pub(crate) fn conclude(
    outcome: Result<()>,
    errors: Vec<TreeError>,
    stats: TraversalStats,
) -> Result<TraversalStats> {
    outcome?;
    if errors.is_empty() {
        Ok(stats)
    } else {
        Err(TreeError::Traversal {
            count: errors.len(),
            errors,
        })
    }
}

struct SequentialRun<'a> {
    ctx: &'a ExecContext,
    visitor: &'a dyn NodeVisitor,
    options: &'a TraversalOptions,
    state: &'a StateCell,
    stats: TraversalStats,
    errors: Vec<TreeError>,
}

impl SequentialRun<'_> {
    fn walk(&mut self, node: &Arc<Node>, depth: usize) -> Result<()> {
        if node.name() == "." {
            return Ok(());
        }
        self.ctx.check()?;

        if !node.is_dir() {
            return self.visit(node, depth);
        }

        let children = node.children();
        match self.options.order {
            TraversalOrder::PreOrder => {
                self.visit(node, depth)?;
                for child in &children {
                    self.walk(child, depth + 1)?;
                }
            }
            TraversalOrder::PostOrder => {
                for child in &children {
                    self.walk(child, depth + 1)?;
                }
                self.visit(node, depth)?;
            }
            TraversalOrder::InOrder => {
                let (left, right) = children.split_at(children.len() / 2);
                for child in left {
                    self.walk(child, depth + 1)?;
                }
                self.visit(node, depth)?;
                for child in right {
                    self.walk(child, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    fn visit(&mut self, node: &Arc<Node>, depth: usize) -> Result<()> {
        self.ctx.check()?;
        self.state.visiting(depth);
        trace!(path = %node.path(), depth, "Visiting node");

        let visitor = self.visitor;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            if node.is_dir() {
                visitor.visit_directory(node, depth)
            } else {
                visitor.visit_file(node, depth)
            }
        }))
        .unwrap_or_else(|payload| {
            Err(TreeError::TraversalPanic {
                path: node.path(),
                name: node.name().to_string(),
                message: panic_message(&*payload),
            })
        });

        match result {
            Ok(()) if node.is_dir() => {
                self.stats.directories += 1;
                Ok(())
            }
            Ok(()) => {
                self.stats.files += 1;
                if let Some(progress) = &self.options.progress {
                    if self.ctx.err().is_none() {
                        progress(self.stats.files, &node.path());
                    }
                }
                Ok(())
            }
            Err(e) if self.options.continue_on_error && !e.is_cancellation() => {
                debug!(path = %node.path(), error = %e, "Visitor error, continuing");
                self.errors.push(e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
