//! Concurrent processing over tree-shaped structures
//!
//! `process_tree` flattens the tree and runs one pooled batch; `process_tree_bfs`
//! finishes every node at depth D before scheduling depth D+1. In both, a failing
//! node only affects its own entry in the result map.

use crate::concurrency::context::ExecContext;
use crate::concurrency::pool::WorkerPool;
use crate::error::Result;
use crate::tree::node::Node;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// A node of any tree that can be processed concurrently
pub trait TreeNode: Clone + Send + Sync + 'static {
    /// Key under which this node's result is reported
    fn id(&self) -> String;

    /// Immediate children, in a stable order
    fn children(&self) -> Vec<Self>;
}

impl TreeNode for Arc<Node> {
    fn id(&self) -> String {
        self.path()
    }

    fn children(&self) -> Vec<Self> {
        Node::children(self)
    }
}

/// Per-node results keyed by node id
pub type NodeResults<T> = HashMap<String, Result<T>>;

fn collect_breadth_first<N: TreeNode>(root: &N) -> Vec<N> {
    let mut nodes = Vec::new();
    let mut queue = VecDeque::from([root.clone()]);
    while let Some(node) = queue.pop_front() {
        queue.extend(node.children());
        nodes.push(node);
    }
    nodes
}

/// Process every node of the tree once, as a single flat batch
///
/// No parent/child ordering is implied.
pub async fn process_tree<N, T, F>(
    ctx: &ExecContext,
    pool: &WorkerPool,
    root: N,
    f: F,
) -> Result<NodeResults<T>>
where
    N: TreeNode,
    T: Send + 'static,
    F: Fn(&N) -> Result<T> + Send + Sync + 'static,
{
    let nodes = collect_breadth_first(&root);
    let ids: Vec<String> = nodes.iter().map(|node| node.id()).collect();
    debug!(nodes = ids.len(), "Processing tree as one batch");

    let results = pool.map(ctx, nodes, move |node: N| f(&node)).await?;
    Ok(ids.into_iter().zip(results).collect())
}

/// Process the tree level by level
///
/// Every node at depth D is processed before any node at depth D+1 starts;
/// order within a level is not guaranteed.
pub async fn process_tree_bfs<N, T, F>(
    ctx: &ExecContext,
    pool: &WorkerPool,
    root: N,
    f: F,
) -> Result<NodeResults<T>>
where
    N: TreeNode,
    T: Send + 'static,
    F: Fn(&N) -> Result<T> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let mut results = HashMap::new();
    let mut level = vec![root];
    let mut depth = 0usize;

    while !level.is_empty() {
        ctx.check()?;
        let ids: Vec<String> = level.iter().map(|node| node.id()).collect();
        let next: Vec<N> = level.iter().flat_map(|node| node.children()).collect();

        let f = Arc::clone(&f);
        let level_results = pool.map(ctx, level, move |node: N| f(&node)).await?;
        debug!(depth, nodes = ids.len(), "Processed tree level");

        results.extend(ids.into_iter().zip(level_results));
        level = next;
        depth += 1;
    }

    Ok(results)
}

/// Run `f` over every file below `root`, keyed by path
pub async fn process_concurrent_files<T, F>(
    ctx: &ExecContext,
    pool: &WorkerPool,
    root: &Arc<Node>,
    f: F,
) -> Result<NodeResults<T>>
where
    T: Send + 'static,
    F: Fn(&Arc<Node>) -> Result<T> + Send + Sync + 'static,
{
    let files: Vec<Arc<Node>> = collect_breadth_first(root)
        .into_iter()
        .filter(|node| !node.is_dir())
        .collect();
    let ids: Vec<String> = files.iter().map(|node| node.path()).collect();

    let results = pool.map(ctx, files, move |node: Arc<Node>| f(&node)).await?;
    Ok(ids.into_iter().zip(results).collect())
}
