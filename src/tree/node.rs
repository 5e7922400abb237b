//! Tree node: one file or directory of a project
//!
//! Ownership runs strictly top-down: a directory owns its children through
//! `Arc<Node>`, while the parent link is a `Weak` back-reference used only for
//! path reconstruction and detaching on deletion.

use crate::error::{Result, TreeError};
use crate::tree::{hasher, path};
use crate::types::{Hash, NodeInfo};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};
use tracing::trace;

/// File content, loaded lazily from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Not read yet; the next read goes to disk
    Unloaded,
    /// Bytes held in memory, shared with readers
    Loaded(Arc<[u8]>),
}

/// Mutable node state, guarded by the per-node lock
#[derive(Debug)]
struct NodeState {
    content: Content,
    info: NodeInfo,
    children: BTreeMap<String, Arc<Node>>,
    modified: bool,
}

/// A file or directory in a project tree
pub struct Node {
    name: String,
    is_dir: bool,
    path: OnceLock<String>,
    parent: Weak<Node>,
    origin: Option<PathBuf>,
    state: RwLock<NodeState>,
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    fn build(
        name: String,
        is_dir: bool,
        path: Option<String>,
        parent: Option<&Arc<Node>>,
        origin: Option<PathBuf>,
        content: Content,
        info: NodeInfo,
        modified: bool,
    ) -> Arc<Node> {
        let cached = OnceLock::new();
        if let Some(path) = path {
            let _ = cached.set(path);
        }
        Arc::new(Node {
            name,
            is_dir,
            path: cached,
            parent: parent.map(Arc::downgrade).unwrap_or_default(),
            origin,
            state: RwLock::new(NodeState {
                content,
                info,
                children: BTreeMap::new(),
                modified,
            }),
        })
    }

    /// Create the root directory node of a tree
    pub(crate) fn new_root(origin: Option<PathBuf>) -> Arc<Node> {
        Self::build(
            String::new(),
            true,
            Some(path::ROOT.to_string()),
            None,
            origin,
            Content::Loaded(Arc::from(Vec::new())),
            NodeInfo::default(),
            false,
        )
    }

    /// Create a directory node below `parent`
    ///
    /// The node is not inserted into the parent's child map; callers do that
    /// together with the project index.
    pub(crate) fn new_directory(
        name: &str,
        parent: &Arc<Node>,
        path: Option<String>,
        origin: Option<PathBuf>,
        info: NodeInfo,
    ) -> Arc<Node> {
        Self::build(
            name.to_string(),
            true,
            path,
            Some(parent),
            origin,
            Content::Loaded(Arc::from(Vec::new())),
            info,
            false,
        )
    }

    /// Create a file node below `parent`
    pub(crate) fn new_file(
        name: &str,
        parent: &Arc<Node>,
        path: Option<String>,
        origin: Option<PathBuf>,
        content: Content,
        info: NodeInfo,
        modified: bool,
    ) -> Arc<Node> {
        Self::build(
            name.to_string(),
            false,
            path,
            Some(parent),
            origin,
            content,
            info,
            modified,
        )
    }

    /// Final path segment ("" for the root)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Normalized project path, reconstructed from parent links on first use
    pub fn path(&self) -> String {
        self.path.get_or_init(|| self.reconstruct_path()).clone()
    }

    fn reconstruct_path(&self) -> String {
        let mut names = vec![self.name.clone()];
        let mut prefix = String::new();
        let mut current = self.parent.upgrade();
        while let Some(node) = current {
            if let Some(cached) = node.path.get() {
                prefix = cached.clone();
                break;
            }
            names.push(node.name.clone());
            current = node.parent.upgrade();
        }
        names.reverse();
        path::normalize_path(&format!("{}/{}", prefix, names.join("/")))
    }

    /// Owning directory, if this node is not a root and its parent is alive
    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.upgrade()
    }

    /// On-disk path backing lazy content loads
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Where this node lives on disk below `root`
    ///
    /// The recorded origin wins: it keeps the entry's exact on-disk spelling,
    /// which may differ from the normalized project path.
    pub(crate) fn disk_path(&self, root: &Path) -> PathBuf {
        self.origin
            .clone()
            .unwrap_or_else(|| path::to_disk_path(root, &self.path()))
    }

    /// Filesystem metadata captured at creation, with size kept current
    pub fn info(&self) -> NodeInfo {
        self.state.read().info.clone()
    }

    pub fn is_content_loaded(&self) -> bool {
        matches!(self.state.read().content, Content::Loaded(_))
    }

    /// True when in-memory content differs from what was last persisted
    pub fn is_modified(&self) -> bool {
        self.state.read().modified
    }

    /// Read file content, loading it from disk on first access
    pub fn read_content(&self) -> Result<Vec<u8>> {
        self.with_content(|bytes| bytes.to_vec())
    }

    /// Run `f` over the file content without copying it out of the node
    ///
    /// No node lock is held while `f` runs, so `f` may write back to this node.
    pub fn with_content<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let bytes = self.loaded_bytes()?;
        Ok(f(&bytes))
    }

    fn loaded_bytes(&self) -> Result<Arc<[u8]>> {
        if self.is_dir {
            return Err(TreeError::CannotReadDirectory(self.path()));
        }

        if let Content::Loaded(bytes) = &self.state.read().content {
            return Ok(Arc::clone(bytes));
        }

        let state = self.state.upgradable_read();
        if let Content::Loaded(bytes) = &state.content {
            return Ok(Arc::clone(bytes));
        }

        let origin = self.origin.as_ref().ok_or_else(|| {
            TreeError::io(
                self.path(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "node has no backing file"),
            )
        })?;
        let bytes: Arc<[u8]> = std::fs::read(origin)
            .map_err(|e| TreeError::io(origin, e))?
            .into();
        trace!(path = %self.path(), size = bytes.len(), "Loaded content from disk");

        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        state.info.size = bytes.len() as u64;
        state.content = Content::Loaded(Arc::clone(&bytes));
        Ok(bytes)
    }

    /// Replace in-memory content and mark the node modified; disk is untouched
    pub fn write_content(&self, content: impl Into<Vec<u8>>) -> Result<()> {
        if self.is_dir {
            return Err(TreeError::CannotWriteDirectory(self.path()));
        }
        let content = content.into();
        let mut state = self.state.write();
        state.info.size = content.len() as u64;
        state.content = Content::Loaded(content.into());
        state.modified = true;
        Ok(())
    }

    /// Drop cached content of an unmodified, disk-backed file
    ///
    /// Returns whether the content was released.
    pub fn unload_content(&self) -> bool {
        if self.is_dir || self.origin.is_none() {
            return false;
        }
        let mut state = self.state.write();
        if state.modified {
            return false;
        }
        state.content = Content::Unloaded;
        true
    }

    /// Compute the node hash
    ///
    /// Files hash their content (loading it if needed); directories hash the
    /// concatenation of their children's hashes in name order.
    pub fn calculate_hash(&self) -> Result<Hash> {
        if !self.is_dir {
            return self.with_content(hasher::compute_content_hash);
        }

        let children = self.children();
        let mut child_hashes = Vec::with_capacity(children.len());
        for child in children {
            child_hashes.push((child.name.clone(), child.calculate_hash()?));
        }
        Ok(hasher::compute_directory_hash(&child_hashes))
    }

    /// Snapshot of the immediate children, sorted by name
    pub fn children(&self) -> Vec<Arc<Node>> {
        self.state.read().children.values().cloned().collect()
    }

    /// Look up an immediate child by name
    pub fn child(&self, name: &str) -> Option<Arc<Node>> {
        self.state.read().children.get(name).cloned()
    }

    pub fn child_count(&self) -> usize {
        self.state.read().children.len()
    }

    /// Names of the immediate child files (directories excluded)
    pub fn list_files(&self) -> Vec<String> {
        self.state
            .read()
            .children
            .values()
            .filter(|child| !child.is_dir)
            .map(|child| child.name.clone())
            .collect()
    }

    /// Number of nodes in this subtree, including self
    pub fn count_nodes(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|child| child.count_nodes())
            .sum::<usize>()
    }

    pub(crate) fn insert_child(&self, child: Arc<Node>) {
        self.state
            .write()
            .children
            .insert(child.name.clone(), child);
    }

    pub(crate) fn remove_child(&self, name: &str) -> Option<Arc<Node>> {
        self.state.write().children.remove(name)
    }

    pub(crate) fn clear_children(&self) {
        self.state.write().children.clear();
    }

    /// Persist content to the backing file if modified, clearing the flag
    ///
    /// Returns whether a write happened.
    pub(crate) fn persist(&self, disk_path: &Path) -> Result<bool> {
        let mut state = self.state.write();
        if !state.modified {
            return Ok(false);
        }
        if let Content::Loaded(bytes) = &state.content {
            std::fs::write(disk_path, &bytes[..]).map_err(|e| TreeError::io(disk_path, e))?;
        }
        state.modified = false;
        Ok(true)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path())
            .field("is_dir", &self.is_dir)
            .field("loaded", &self.is_content_loaded())
            .field("children", &self.child_count())
            .finish()
    }
}
