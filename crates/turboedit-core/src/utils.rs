//! Shared helpers: hashing, id generation and path resolution.

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};

/// Compute the SHA-256 hex digest of raw bytes.
pub fn compute_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Derive the checkpoint id for a change group.
///
/// Fixed-width (64 hex chars) and a pure function of `group_id`, so the
/// checkpoint of a group can be located without a separate index.
pub fn checkpoint_id_for_group(group_id: &str) -> String {
    compute_hash(group_id.as_bytes())
}

/// Generate a fresh opaque identifier.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Resolve `path` against `root` unless it is already absolute, folding `.`
/// and `..` components lexically (the target may not exist yet).
pub fn resolve_path(root: &Path, path: &str) -> Result<PathBuf> {
    if path.trim().is_empty() {
        return Err(Error::invalid_path("empty file path"));
    }
    let candidate = Path::new(path);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_id_is_deterministic_and_fixed_width() {
        let a = checkpoint_id_for_group("group-1");
        let b = checkpoint_id_for_group("group-1");
        let c = checkpoint_id_for_group("group-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert_eq!(checkpoint_id_for_group("").len(), 64);
    }

    #[test]
    fn test_generate_id_unique() {
        assert_ne!(generate_id(), generate_id());
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let root = Path::new("/project");
        assert_eq!(
            resolve_path(root, "src/./lib.rs").unwrap(),
            PathBuf::from("/project/src/lib.rs")
        );
        assert_eq!(
            resolve_path(root, "src/../README.md").unwrap(),
            PathBuf::from("/project/README.md")
        );
        assert_eq!(
            resolve_path(root, "/tmp/x.txt").unwrap(),
            PathBuf::from("/tmp/x.txt")
        );
        assert!(resolve_path(root, "  ").is_err());
    }
}
