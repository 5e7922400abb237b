//! Filesystem synchronization: load a project tree from disk and persist it back

use crate::error::{Result, TreeError};
use crate::tree::node::{Content, Node};
use crate::tree::path;
use crate::tree::project::Project;
use crate::tree::walker::{Entry, Walker};
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Summary of a `sync_from_fs` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

impl Project {
    /// Rebuild the in-memory tree from disk
    ///
    /// File nodes are created unloaded; content is read on first access.
    /// Entries that cannot be read are logged and skipped, as are entries whose
    /// name collides with a sibling once normalized (the first in name order
    /// wins, together with its subtree).
    #[instrument(skip(self), fields(root = %self.root_path().display()))]
    pub fn sync_from_fs(&self) -> Result<SyncStats> {
        let start = Instant::now();
        let root_path = self.root_path().to_path_buf();

        let metadata = fs::metadata(&root_path).map_err(|e| TreeError::io(&root_path, e))?;
        if !metadata.is_dir() {
            return Err(TreeError::NotADirectory(root_path.display().to_string()));
        }

        let outcome = Walker::with_config(root_path.clone(), self.walker_config().clone()).walk();
        debug!(entry_count = outcome.entries.len(), "Walked filesystem");

        let mut stats = SyncStats {
            skipped: outcome.skipped,
            ..SyncStats::default()
        };

        let mut index = self.index().write();
        Project::reset(&mut index, self.root());

        for entry in outcome.entries {
            let project_path = match path::from_disk_path(&root_path, entry.path()) {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "Skipping entry outside the project root");
                    stats.skipped += 1;
                    continue;
                }
            };
            let Some((parent_path, name)) = path::split_parent(&project_path) else {
                continue;
            };
            // The indexed parent must be the very directory this entry was read from
            let parent = match index.get(parent_path) {
                Some(parent) if parent.is_dir() && parent.origin() == entry.path().parent() => {
                    Arc::clone(parent)
                }
                _ => {
                    warn!(path = %project_path, "Skipping entry whose parent was not synced");
                    stats.skipped += 1;
                    continue;
                }
            };
            if index.contains_key(&project_path) {
                warn!(
                    path = %project_path,
                    disk = %entry.path().display(),
                    "Skipping entry whose normalized name collides with a sibling"
                );
                stats.skipped += 1;
                continue;
            }

            let node = match entry {
                Entry::Directory { path: disk, info } => {
                    stats.directories += 1;
                    Node::new_directory(name, &parent, Some(project_path.clone()), Some(disk), info)
                }
                Entry::File { path: disk, info } => {
                    stats.files += 1;
                    Node::new_file(
                        name,
                        &parent,
                        Some(project_path.clone()),
                        Some(disk),
                        Content::Unloaded,
                        info,
                        false,
                    )
                }
            };
            Project::attach(&mut index, &parent, node);
        }

        info!(
            files = stats.files,
            directories = stats.directories,
            skipped = stats.skipped,
            duration_ms = start.elapsed().as_millis(),
            "Project sync completed"
        );
        Ok(stats)
    }

    /// Persist the tree to disk
    ///
    /// Every directory is created if missing; only files flagged as modified are
    /// written, and their flag is cleared. Returns the number of files written.
    #[instrument(skip(self), fields(root = %self.root_path().display()))]
    pub fn save_to_fs(&self) -> Result<usize> {
        let start = Instant::now();
        // Hold off structural changes while the tree is written out
        let _index = self.index().read();
        let written = self.save_node(self.root())?;
        info!(
            written,
            duration_ms = start.elapsed().as_millis(),
            "Project save completed"
        );
        Ok(written)
    }

    fn save_node(&self, node: &Arc<Node>) -> Result<usize> {
        let disk = node.disk_path(self.root_path());
        if node.is_dir() {
            fs::create_dir_all(&disk).map_err(|e| TreeError::io(&disk, e))?;
            let mut written = 0;
            for child in node.children() {
                written += self.save_node(&child)?;
            }
            Ok(written)
        } else if node.persist(&disk)? {
            debug!(path = %node.path(), "Wrote modified file");
            Ok(1)
        } else {
            Ok(0)
        }
    }
}
