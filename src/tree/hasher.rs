//! Hash computation for tree nodes using SHA-256

use crate::types::Hash;
use sha2::{Digest, Sha256};

/// Compute content hash for file bytes
pub fn compute_content_hash(content: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hasher.finalize().into()
}

/// Compute the structural hash of a directory
///
/// Hash = SHA-256(child_hash_1 || child_hash_2 || ...), children ordered by name.
/// The input is sorted here so callers may pass children in any order.
pub fn compute_directory_hash(children: &[(String, Hash)]) -> Hash {
    let mut sorted: Vec<&(String, Hash)> = children.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (_, child_hash) in sorted {
        hasher.update(child_hash);
    }
    hasher.finalize().into()
}

/// Hex form of a hash, for logs and display
pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}
