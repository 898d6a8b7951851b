// src/snapshot/paths.rs

//! Path normalization for snapshot keys.
//!
//! Snapshot entries are keyed by a normalized relative path so that the same
//! file always produces the same key regardless of how it was spelled:
//! forward slashes, no `./` prefix, no `.` segments, no empty segments and no
//! trailing slash. Paths outside the project root (headers listed by a
//! compiler depfile, for instance) keep their leading `/`.

use std::path::{Path, PathBuf};

/// Normalize a path string into a snapshot key.
///
/// `..` segments are kept verbatim; resolving them would require touching
/// the filesystem. An absolute path stays absolute.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let joined = path
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/");
    if path.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Snapshot key for `raw`, a path given relative to `root` or absolute.
///
/// Absolute paths below `root` are keyed relative to it; absolute paths
/// elsewhere are keyed by their normalized absolute spelling.
pub fn snapshot_key(root: &Path, raw: &str) -> String {
    let key = normalize_path(raw);
    if Path::new(&key).is_absolute() {
        if let Some(rel) = relative_key(root, Path::new(&key)) {
            return rel;
        }
    }
    key
}

/// Convert a path into a normalized key relative to `root`.
///
/// A direct `strip_prefix(root)` is tried first; paths that were given
/// relative to the root are accepted as they are.
///
/// Returns `None` if the path is absolute and lies outside `root`.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(normalize_path(&rel.to_string_lossy()));
    }

    if path.is_relative() {
        return Some(normalize_path(&path.to_string_lossy()));
    }

    None
}

/// Resolve a normalized key back to a path. Relative keys live under `root`.
pub fn resolve(root: &Path, key: &str) -> PathBuf {
    if key.is_empty() {
        root.to_path_buf()
    } else if Path::new(key).is_absolute() {
        PathBuf::from(key)
    } else {
        root.join(key)
    }
}
