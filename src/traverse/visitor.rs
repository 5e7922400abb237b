//! Visitor interface for tree traversal

use crate::error::Result;
use crate::tree::node::Node;
use std::sync::Arc;

/// Callbacks invoked by `TreeTraverser` for each visited node
///
/// Parallel traversal calls the visitor from several threads at once.
pub trait NodeVisitor: Send + Sync {
    fn visit_directory(&self, node: &Arc<Node>, depth: usize) -> Result<()>;

    fn visit_file(&self, node: &Arc<Node>, depth: usize) -> Result<()>;
}

/// A closure visitor handling directories and files alike
pub struct VisitorFn<F>(pub F);

impl<F> NodeVisitor for VisitorFn<F>
where
    F: Fn(&Arc<Node>, usize) -> Result<()> + Send + Sync,
{
    fn visit_directory(&self, node: &Arc<Node>, depth: usize) -> Result<()> {
        (self.0)(node, depth)
    }

    fn visit_file(&self, node: &Arc<Node>, depth: usize) -> Result<()> {
        (self.0)(node, depth)
    }
}

/// Wrap a closure as a [`NodeVisitor`]
pub fn visitor_fn<F>(f: F) -> VisitorFn<F>
where
    F: Fn(&Arc<Node>, usize) -> Result<()> + Send + Sync,
{
    VisitorFn(f)
}
