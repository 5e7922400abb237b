//! Visitor-based tree traversal
//!
//! Sequential traversal is deterministic (children in name order). Parallel
//! traversal fans children out as tasks bounded by a per-call ceiling and the
//! process-wide traversal gate.

mod parallel;
pub mod traverser;
pub mod visitor;

pub use traverser::{
    ProgressCallback, TraversalOptions, TraversalOrder, TraversalState, TraversalStats,
    TreeTraverser,
};
pub use visitor::{visitor_fn, NodeVisitor, VisitorFn};

use crate::concurrency::context::ExecContext;
use crate::error::Result;
use crate::tree::node::Node;
use std::sync::Arc;

/// Sequentially visit `root` in `order` with default options
pub fn traverse_tree(
    ctx: &ExecContext,
    root: &Arc<Node>,
    order: TraversalOrder,
    visitor: &dyn NodeVisitor,
) -> Result<TraversalStats> {
    TreeTraverser::new(TraversalOptions::default().with_order(order)).traverse(ctx, root, visitor)
}

/// Visit `root` in parallel in `order` with default options
pub async fn traverse_tree_parallel(
    ctx: &ExecContext,
    root: Arc<Node>,
    order: TraversalOrder,
    visitor: Arc<dyn NodeVisitor>,
) -> Result<TraversalStats> {
    TreeTraverser::new(TraversalOptions::default().with_order(order))
        .traverse_parallel(ctx, root, visitor)
        .await
}
