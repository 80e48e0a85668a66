//! Path containment guard
//!
//! Every path that reaches a [`Match`](crate::models::Match) passes through
//! [`is_path_allowed`], whether it came from the directory walker or from the
//! output of an external search process. Parent-traversal components are
//! rejected outright; containment is a component-wise prefix check against
//! the cleaned allowed roots.

use std::path::{Component, Path, PathBuf};

use crate::error::PathError;

/// Lexically clean a path: drop `.` components and fold `name/..` pairs.
///
/// No filesystem access is performed and symlinks are not resolved. A `..`
/// directly under the root is dropped (`/..` is `/`); leading `..` of a
/// relative path is kept.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Whether any component of `path` is `..`
pub fn has_parent_traversal(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Resolve a user-supplied directory to an absolute, cleaned path.
///
/// Fails if the cleaned path still contains `..`, cannot be resolved,
/// does not exist, or is not a directory.
pub fn normalize_and_validate_dir(path: impl AsRef<Path>) -> Result<PathBuf, PathError> {
    let path = path.as_ref();

    let absolute = std::path::absolute(path).map_err(|source| PathError::Resolve {
        path: path.to_path_buf(),
        source,
    })?;
    let cleaned = clean_path(&absolute);

    if has_parent_traversal(&cleaned) {
        return Err(PathError::ParentTraversal(cleaned));
    }

    let metadata = std::fs::metadata(&cleaned).map_err(|source| PathError::Resolve {
        path: cleaned.clone(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(PathError::NotADirectory(cleaned));
    }

    Ok(cleaned)
}

/// Whether `candidate` lies inside (or is) one of `allowed_roots`.
///
/// A candidate carrying any `..` component is rejected even when it would
/// clean to a location inside a root. No roots means nothing is allowed.
pub fn is_path_allowed(candidate: &Path, allowed_roots: &[PathBuf]) -> bool {
    if has_parent_traversal(candidate) {
        return false;
    }

    let cleaned = clean_path(candidate);
    if has_parent_traversal(&cleaned) {
        return false;
    }

    allowed_roots.iter().any(|root| {
        let root = clean_path(root);
        cleaned == root || cleaned.starts_with(&root)
    })
}
