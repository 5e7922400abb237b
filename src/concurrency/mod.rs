//! Concurrency primitives
//!
//! Execution contexts, the bounded worker pool, the process-wide traversal gate
//! and generic tree processors built on the pool.

pub mod bfs;
pub mod context;
pub mod gate;
pub mod pool;

pub use bfs::{process_concurrent_files, process_tree, process_tree_bfs, NodeResults, TreeNode};
pub use context::ExecContext;
pub use pool::WorkerPool;
