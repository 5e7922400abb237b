//! Process-wide root → project registry
//!
//! Lets a subsystem holding only a `Node` (reached by walking a tree) recover the
//! owning `Project`. Entries are weak: a project registers on construction and
//! unregisters when dropped, so the table never keeps a project alive.

use crate::tree::node::Node;
use crate::tree::project::Project;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};
use tracing::trace;

type RegistryMap = HashMap<usize, Weak<Project>>;

fn registry() -> &'static RwLock<RegistryMap> {
    static REGISTRY: OnceLock<RwLock<RegistryMap>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn key(root: &Arc<Node>) -> usize {
    Arc::as_ptr(root) as usize
}

/// Register a project under its root node
pub(crate) fn register(project: &Arc<Project>) {
    let root = project.root();
    trace!(root = key(root), "Registering project");
    registry()
        .write()
        .insert(key(root), Arc::downgrade(project));
}

/// Remove the entry for a root node
pub(crate) fn unregister(root: &Arc<Node>) {
    trace!(root = key(root), "Unregistering project");
    registry().write().remove(&key(root));
}

/// Find the project owning `node`
///
/// Walks parent links up to the root, then looks the root up. Returns `None`
/// for nodes of dropped projects, trees never attached to a project, and nodes
/// removed from their project (a deleted node may still reach a live parent).
pub fn lookup(node: &Arc<Node>) -> Option<Arc<Project>> {
    let mut root = node.clone();
    while let Some(parent) = root.parent() {
        root = parent;
    }
    let project = registry().read().get(&key(&root)).and_then(Weak::upgrade)?;
    if Arc::ptr_eq(&root, node) {
        return Some(project);
    }

    let attached = project
        .find_node(&node.path())
        .is_ok_and(|indexed| Arc::ptr_eq(&indexed, node));
    attached.then_some(project)
}

/// Number of live registrations
pub fn registered_count() -> usize {
    registry()
        .read()
        .values()
        .filter(|project| project.strong_count() > 0)
        .count()
}
