//! Project: the tree container mirroring one directory on disk
//!
//! The flat path index is the authoritative O(1) lookup; child maps carry the
//! structure used by traversal. Every structural change updates both under the
//! project write lock, always taken before any node lock.

use crate::error::{Result, TreeError};
use crate::tree::node::{Content, Node};
use crate::tree::walker::WalkerConfig;
use crate::tree::{path, registry};
use crate::types::{Hash, NodeInfo};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

type NodeIndex = HashMap<String, Arc<Node>>;

/// In-memory mirror of a project directory
pub struct Project {
    root_path: PathBuf,
    root: Arc<Node>,
    nodes: RwLock<NodeIndex>,
    walker_config: WalkerConfig,
}

impl Project {
    /// Create an empty project mirroring `root_path`
    ///
    /// The directory is created if missing. The project is registered in the
    /// process-wide registry until dropped.
    pub fn new(root_path: impl AsRef<Path>) -> Result<Arc<Self>> {
        Self::with_walker_config(root_path, WalkerConfig::default())
    }

    /// Create an empty project whose sync uses a custom walker configuration
    pub fn with_walker_config(
        root_path: impl AsRef<Path>,
        walker_config: WalkerConfig,
    ) -> Result<Arc<Self>> {
        let requested = root_path.as_ref();
        fs::create_dir_all(requested).map_err(|e| TreeError::io(requested, e))?;
        let root_path = path::canonicalize_root(requested)?;

        let root = Node::new_root(Some(root_path.clone()));
        let mut nodes = HashMap::new();
        nodes.insert(path::ROOT.to_string(), root.clone());

        let project = Arc::new(Self {
            root_path,
            root,
            nodes: RwLock::new(nodes),
            walker_config,
        });
        registry::register(&project);
        debug!(root = %project.root_path.display(), "Created project");
        Ok(project)
    }

    /// Build a project tree from an existing directory
    pub fn load(root_path: impl AsRef<Path>) -> Result<Arc<Self>> {
        Self::load_with_walker_config(root_path, WalkerConfig::default())
    }

    /// Build a project tree from an existing directory with a custom walker configuration
    pub fn load_with_walker_config(
        root_path: impl AsRef<Path>,
        walker_config: WalkerConfig,
    ) -> Result<Arc<Self>> {
        let requested = root_path.as_ref();
        let metadata = fs::metadata(requested).map_err(|e| TreeError::io(requested, e))?;
        if !metadata.is_dir() {
            return Err(TreeError::NotADirectory(requested.display().to_string()));
        }
        let project = Self::with_walker_config(requested, walker_config)?;
        project.sync_from_fs()?;
        Ok(project)
    }

    /// Find the project owning `node` through the process-wide registry
    pub fn for_node(node: &Arc<Node>) -> Option<Arc<Project>> {
        registry::lookup(node)
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    /// Absolute, canonical directory this project mirrors
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub(crate) fn walker_config(&self) -> &WalkerConfig {
        &self.walker_config
    }

    /// Normalize a project path (see [`path::normalize_path`])
    pub fn normalize_path(path: &str) -> String {
        path::normalize_path(path)
    }

    /// Map a project path onto the disk
    ///
    /// Existing nodes map to the entry they were loaded from.
    pub fn absolute_path(&self, path: &str) -> PathBuf {
        let normalized = path::normalize_path(path);
        match self.nodes.read().get(&normalized) {
            Some(node) => node.disk_path(&self.root_path),
            None => path::to_disk_path(&self.root_path, &normalized),
        }
    }

    /// Disk location for a new child `name` of `parent`
    fn child_disk_path(&self, parent: &Node, name: &str) -> PathBuf {
        parent.disk_path(&self.root_path).join(name)
    }

    /// Map a disk path below the root back to a project path
    pub fn relative_path(&self, disk_path: &Path) -> Result<String> {
        path::from_disk_path(&self.root_path, disk_path)
    }

    /// Look up a node by path in O(1)
    pub fn find_node(&self, path: &str) -> Result<Arc<Node>> {
        let normalized = path::normalize_path(path);
        if normalized == path::ROOT {
            return Ok(self.root.clone());
        }
        self.nodes
            .read()
            .get(&normalized)
            .cloned()
            .ok_or(TreeError::NotFound(normalized))
    }

    /// Path of a node, reconstructed from parent links when not cached
    pub fn get_node_path(&self, node: &Node) -> String {
        node.path()
    }

    /// Split `path` into its existing parent directory and final segment
    pub fn resolve_path(&self, path: &str) -> Result<(Arc<Node>, String)> {
        let normalized = path::normalize_path(path);
        let index = self.nodes.read();
        let (parent, name) = Self::resolve_in(&index, &normalized)?;
        Ok((parent, name.to_string()))
    }

    fn resolve_in<'p>(index: &NodeIndex, normalized: &'p str) -> Result<(Arc<Node>, &'p str)> {
        let (parent_path, name) = path::split_parent(normalized)
            .ok_or_else(|| TreeError::InvalidPath("the root has no parent".to_string()))?;

        let mut current = path::ROOT.to_string();
        for segment in path::segments(parent_path) {
            current = path::join(&current, segment);
            match index.get(&current) {
                None => return Err(TreeError::NotFound(current)),
                Some(node) if !node.is_dir() => return Err(TreeError::NotADirectory(current)),
                Some(_) => {}
            }
        }

        let parent = index
            .get(parent_path)
            .cloned()
            .ok_or_else(|| TreeError::NotFound(parent_path.to_string()))?;
        Ok((parent, name))
    }

    pub(crate) fn attach(index: &mut NodeIndex, parent: &Arc<Node>, node: Arc<Node>) {
        parent.insert_child(node.clone());
        index.insert(node.path(), node);
    }

    /// Create a directory; its parent must already exist
    pub fn create_dir(&self, path: &str) -> Result<Arc<Node>> {
        let normalized = path::normalize_path(path);
        let mut index = self.nodes.write();
        if index.contains_key(&normalized) {
            return Err(TreeError::AlreadyExists(normalized));
        }
        let (parent, name) = Self::resolve_in(&index, &normalized)?;

        let disk = self.child_disk_path(&parent, name);
        fs::create_dir_all(&disk).map_err(|e| TreeError::io(&disk, e))?;
        let info = disk_info(&disk);

        let node = Node::new_directory(name, &parent, Some(normalized.clone()), Some(disk), info);
        Self::attach(&mut index, &parent, node.clone());
        debug!(path = %normalized, "Created directory");
        Ok(node)
    }

    /// Create an empty file in memory; persisted by `save_to_fs`
    pub fn create_file(&self, path: &str) -> Result<Arc<Node>> {
        self.create_file_with_content(path, Vec::new())
    }

    /// Create a file with content in memory; persisted by `save_to_fs`
    pub fn create_file_with_content(
        &self,
        path: &str,
        content: impl Into<Vec<u8>>,
    ) -> Result<Arc<Node>> {
        let normalized = path::normalize_path(path);
        let mut index = self.nodes.write();
        if index.contains_key(&normalized) {
            return Err(TreeError::AlreadyExists(normalized));
        }
        let (parent, name) = Self::resolve_in(&index, &normalized)?;

        let node = self.new_loaded_file(&parent, name, &normalized, content.into());
        Self::attach(&mut index, &parent, node.clone());
        debug!(path = %normalized, "Created file");
        Ok(node)
    }

    /// Create a file node whose content stays on disk until first read
    ///
    /// An empty placeholder file is written when nothing exists on disk yet.
    pub fn create_file_node(&self, path: &str) -> Result<Arc<Node>> {
        let normalized = path::normalize_path(path);
        let mut index = self.nodes.write();
        if index.contains_key(&normalized) {
            return Err(TreeError::AlreadyExists(normalized));
        }
        let (parent, name) = Self::resolve_in(&index, &normalized)?;

        let disk = self.child_disk_path(&parent, name);
        if !disk.exists() {
            fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&disk)
                .map_err(|e| TreeError::io(&disk, e))?;
        }
        let info = disk_info(&disk);

        let node = Node::new_file(
            name,
            &parent,
            Some(normalized.clone()),
            Some(disk),
            Content::Unloaded,
            info,
            false,
        );
        Self::attach(&mut index, &parent, node.clone());
        debug!(path = %normalized, "Created lazy file node");
        Ok(node)
    }

    /// Write file content, creating the file and any missing parent directories
    ///
    /// Create-on-write is part of the contract: writing to an absent path never
    /// fails with `NotFound`. Missing directories are created on disk and in
    /// memory; the file itself is persisted by `save_to_fs`.
    pub fn write_file(&self, path: &str, content: impl Into<Vec<u8>>) -> Result<Arc<Node>> {
        let normalized = path::normalize_path(path);
        let content = content.into();

        {
            // Held across the write; delete_node cannot detach the node in between
            let index = self.nodes.read();
            if let Some(node) = index.get(&normalized) {
                node.write_content(content)?;
                return Ok(Arc::clone(node));
            }
        }

        let mut index = self.nodes.write();
        if let Some(node) = index.get(&normalized).cloned() {
            node.write_content(content)?;
            return Ok(node);
        }

        let (parent_path, name) = path::split_parent(&normalized)
            .ok_or_else(|| TreeError::CannotWriteDirectory(normalized.clone()))?;
        let parent = self.ensure_directories(&mut index, parent_path)?;

        let node = self.new_loaded_file(&parent, name, &normalized, content);
        Self::attach(&mut index, &parent, node.clone());
        debug!(path = %normalized, "Created file on write");
        Ok(node)
    }

    /// Read a file's content by path
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.find_node(path)?.read_content()
    }

    fn new_loaded_file(
        &self,
        parent: &Arc<Node>,
        name: &str,
        normalized: &str,
        content: Vec<u8>,
    ) -> Arc<Node> {
        let info = NodeInfo {
            size: content.len() as u64,
            ..NodeInfo::default()
        };
        Node::new_file(
            name,
            parent,
            Some(normalized.to_string()),
            Some(self.child_disk_path(parent, name)),
            Content::Loaded(content.into()),
            info,
            true,
        )
    }

    /// Make sure every directory along `dir_path` exists, returning the last one
    fn ensure_directories(&self, index: &mut NodeIndex, dir_path: &str) -> Result<Arc<Node>> {
        // Reject file components before touching disk
        let mut current = path::ROOT.to_string();
        for segment in path::segments(dir_path) {
            current = path::join(&current, segment);
            if let Some(node) = index.get(&current) {
                if !node.is_dir() {
                    return Err(TreeError::NotADirectory(current));
                }
            }
        }

        let mut parent = self.root.clone();
        let mut current = path::ROOT.to_string();
        for segment in path::segments(dir_path) {
            current = path::join(&current, segment);
            parent = match index.get(&current).cloned() {
                Some(existing) => existing,
                None => {
                    let disk = self.child_disk_path(&parent, segment);
                    fs::create_dir_all(&disk).map_err(|e| TreeError::io(&disk, e))?;
                    let info = disk_info(&disk);
                    let node =
                        Node::new_directory(segment, &parent, Some(current.clone()), Some(disk), info);
                    Self::attach(index, &parent, node.clone());
                    debug!(path = %current, "Created directory implicitly");
                    node
                }
            };
        }
        Ok(parent)
    }

    /// Delete a node and, for directories, everything below it
    ///
    /// The backing file or directory is removed from disk as well; the node is
    /// detached from its parent and purged from the index in one step.
    pub fn delete_node(&self, path: &str) -> Result<()> {
        let normalized = path::normalize_path(path);
        if normalized == path::ROOT {
            return Err(TreeError::CannotDeleteRoot);
        }

        let mut index = self.nodes.write();
        let node = index
            .get(&normalized)
            .cloned()
            .ok_or_else(|| TreeError::NotFound(normalized.clone()))?;
        let parent = node
            .parent()
            .ok_or_else(|| TreeError::NotFound(normalized.clone()))?;

        let disk = node.disk_path(&self.root_path);
        let removal = if node.is_dir() {
            fs::remove_dir_all(&disk)
        } else {
            fs::remove_file(&disk)
        };
        match removal {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(TreeError::io(&disk, e)),
        }

        parent.remove_child(node.name());
        let purged = Self::purge(&mut index, &node);
        debug!(path = %normalized, purged, "Deleted node");
        Ok(())
    }

    fn purge(index: &mut NodeIndex, node: &Arc<Node>) -> usize {
        let mut purged = usize::from(index.remove(&node.path()).is_some());
        for child in node.children() {
            purged += Self::purge(index, &child);
        }
        purged
    }

    /// Drop every node but the root
    pub(crate) fn reset(index: &mut NodeIndex, root: &Arc<Node>) {
        root.clear_children();
        index.clear();
        index.insert(path::ROOT.to_string(), root.clone());
    }

    pub(crate) fn index(&self) -> &RwLock<NodeIndex> {
        &self.nodes
    }

    /// Number of nodes in the project, root included
    pub fn get_total_nodes(&self) -> usize {
        self.nodes.read().len()
    }

    /// True when the project holds nothing but its root
    pub fn is_empty(&self) -> bool {
        self.get_total_nodes() == 1
    }

    /// All indexed paths, sorted
    pub fn list_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.nodes.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Structural hash of the whole project
    pub fn calculate_hash(&self) -> Result<Hash> {
        let hash = self.root.calculate_hash()?;
        info!(root_hash = %hex::encode(hash), "Computed project hash");
        Ok(hash)
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        registry::unregister(&self.root);
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("root_path", &self.root_path)
            .field("nodes", &self.get_total_nodes())
            .finish()
    }
}

fn disk_info(disk: &Path) -> NodeInfo {
    fs::metadata(disk)
        .map(|metadata| NodeInfo::from_metadata(&metadata))
        .unwrap_or_default()
}
