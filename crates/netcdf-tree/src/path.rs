//! POSIX-style node path helpers.
//!
//! Paths are absolute, `/`-separated, and the root group is `/`.

use crate::error::{TreeError, TreeResult};

/// Path of the root group.
pub const ROOT: &str = "/";

/// Check that a path is absolute and has no empty segments.
pub fn validate(path: &str) -> TreeResult<()> {
    if path == ROOT {
        return Ok(());
    }
    if !path.starts_with('/') || path.ends_with('/') || path[1..].split('/').any(str::is_empty) {
        return Err(TreeError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Split a path into its parent group path and basename.
///
/// The root splits into `("/", "")`.
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => (ROOT, &path[1..]),
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => (ROOT, path),
    }
}

/// Parent group path of a node.
pub fn parent(path: &str) -> &str {
    split(path).0
}

/// Basename of a node (empty for the root).
pub fn basename(path: &str) -> &str {
    split(path).1
}

/// Join a group path and a child name.
pub fn join(group: &str, name: &str) -> String {
    if group == ROOT {
        format!("/{}", name)
    } else {
        format!("{}/{}", group, name)
    }
}

/// Number of segments below the root (`/` is 0, `/a/b` is 2).
pub fn depth(path: &str) -> usize {
    path.split('/').filter(|segment| !segment.is_empty()).count()
}

/// The group itself followed by each ancestor up to the root.
pub fn ancestors(group: &str) -> Vec<&str> {
    let mut chain = vec![group];
    let mut current = group;
    while current != ROOT {
        current = parent(current);
        chain.push(current);
    }
    chain
}
