//! Core types shared across the project tree engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hash: SHA-256 digest of a file's content or a directory's structure
pub type Hash = [u8; 32];

/// Filesystem metadata captured for a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Unix permission bits, 0 where unavailable
    pub mode: u32,
    /// Last modification time reported by the filesystem
    pub modified: Option<DateTime<Utc>>,
}

impl NodeInfo {
    /// Capture node info from filesystem metadata
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            metadata.permissions().mode()
        };
        #[cfg(not(unix))]
        let mode = 0;

        Self {
            size: if metadata.is_file() { metadata.len() } else { 0 },
            mode,
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        }
    }
}
