//! Project Tree
//!
//! Represents a project directory as an in-memory tree of nodes with lazily
//! loaded content, a flat path index and deterministic structural hashes.

pub mod hasher;
pub mod node;
pub mod path;
pub mod project;
pub mod registry;
pub mod sync;
pub mod walker;

pub use node::{Content, Node};
pub use project::Project;
pub use sync::SyncStats;
