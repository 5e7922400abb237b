//! Filesystem walker feeding project synchronization

use crate::types::NodeInfo;
use std::path::PathBuf;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Filesystem entry types
#[derive(Debug, Clone)]
pub enum Entry {
    /// A file entry with its path and metadata
    File { path: PathBuf, info: NodeInfo },
    /// A directory entry with its path and metadata
    Directory { path: PathBuf, info: NodeInfo },
}

impl Entry {
    /// Absolute disk path of the entry
    pub fn path(&self) -> &PathBuf {
        match self {
            Entry::File { path, .. } | Entry::Directory { path, .. } => path,
        }
    }
}

/// Filesystem walker configuration
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Whether to follow symbolic links (default: false)
    pub follow_symlinks: bool,
    /// Entry names to skip along with everything below them (e.g. ".git")
    pub ignore_patterns: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    pub max_depth: Option<usize>,
}

/// Result of a walk: the entries found plus the number of entries skipped on error
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub entries: Vec<Entry>,
    pub skipped: usize,
}

/// Filesystem walker
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    /// Walk the filesystem below the root, excluding the root itself
    ///
    /// Entries come out in pre-order with siblings sorted by name, so every
    /// directory precedes its contents. Unreadable entries are logged and skipped.
    pub fn walk(&self) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();

        let walker = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .min_depth(1)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.should_ignore(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry during walk");
                    outcome.skipped += 1;
                    continue;
                }
            };

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping entry without metadata");
                    outcome.skipped += 1;
                    continue;
                }
            };

            let path = entry.path().to_path_buf();
            let info = NodeInfo::from_metadata(&metadata);
            if metadata.is_dir() {
                outcome.entries.push(Entry::Directory { path, info });
            } else if metadata.is_file() {
                outcome.entries.push(Entry::File { path, info });
            }
            // Symlinks and special files are not mirrored
        }

        outcome
    }

    /// Check if an entry name matches one of the ignore patterns
    fn should_ignore(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.config
            .ignore_patterns
            .iter()
            .any(|pattern| pattern.as_str() == name)
    }
}
