//! Projtree: In-Memory Project Tree Engine
//!
//! Mirrors a directory on disk as a tree of nodes with lazily loaded file content,
//! SHA-256 content and structural hashing, path-based create/read/write/delete,
//! and sequential or parallel visitor traversal with cancellation and timeouts.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod logging;
pub mod traverse;
pub mod tree;
pub mod types;

pub use concurrency::{
    process_concurrent_files, process_tree, process_tree_bfs, ExecContext, NodeResults, TreeNode,
    WorkerPool,
};
pub use config::{ConfigLoader, EngineConfig};
pub use error::{Result, TreeError};
pub use traverse::{
    traverse_tree, traverse_tree_parallel, visitor_fn, NodeVisitor, TraversalOptions,
    TraversalOrder, TraversalStats, TreeTraverser,
};
pub use tree::{Content, Node, Project, SyncStats};
pub use types::{Hash, NodeInfo};
