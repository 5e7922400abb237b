//! Path canonicalization and normalization utilities
//!
//! Project paths are slash-separated, rooted at `/` and Unicode NFC. Disk paths
//! only appear at the boundary, when mapping a project path onto `root_path`.

use crate::error::{Result, TreeError};
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// The project root path
pub const ROOT: &str = "/";

/// Canonicalize the on-disk root of a project
///
/// Resolves symlinks, `..` and `.` through the filesystem, so the directory must exist.
pub fn canonicalize_root(path: &Path) -> Result<PathBuf> {
    // Use dunce for cross-platform canonicalization
    dunce::canonicalize(path).map_err(|e| TreeError::io(path, e))
}

/// Normalize a project path without filesystem access
///
/// This function:
/// 1. Normalizes Unicode to NFC
/// 2. Treats `\` as a separator
/// 3. Drops empty and `.` segments, resolves `..` (never above root)
/// 4. Forces a single leading slash and no trailing slash (except root)
pub fn normalize_path(path: &str) -> String {
    let normalized: String = path.nfc().collect();

    let mut segments: Vec<&str> = Vec::new();
    for segment in normalized.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return ROOT.to_string();
    }

    let mut result = String::with_capacity(normalized.len() + 1);
    for segment in segments {
        result.push('/');
        result.push_str(segment);
    }
    result
}

/// Split a normalized path into its parent path and final segment
///
/// Returns `None` for the root.
pub fn split_parent(path: &str) -> Option<(&str, &str)> {
    if path == ROOT {
        return None;
    }
    let idx = path.rfind('/')?;
    let parent = if idx == 0 { ROOT } else { &path[..idx] };
    Some((parent, &path[idx + 1..]))
}

/// Join a normalized parent path and a child segment
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Iterate the segments of a normalized path
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Map a normalized project path onto the disk below `root`
pub fn to_disk_path(root: &Path, path: &str) -> PathBuf {
    let mut disk = root.to_path_buf();
    for segment in segments(path) {
        disk.push(segment);
    }
    disk
}

/// Map a disk path below `root` back to a normalized project path
pub fn from_disk_path(root: &Path, disk: &Path) -> Result<String> {
    let relative = disk.strip_prefix(root).map_err(|_| {
        TreeError::InvalidPath(format!(
            "{} is outside project root {}",
            disk.display(),
            root.display()
        ))
    })?;

    let mut out = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                out.push('/');
                out.push_str(&name.to_string_lossy());
            }
            Component::CurDir => {}
            other => {
                return Err(TreeError::InvalidPath(format!(
                    "Unexpected path component {:?} in {}",
                    other,
                    disk.display()
                )))
            }
        }
    }
    Ok(normalize_path(&out))
}
