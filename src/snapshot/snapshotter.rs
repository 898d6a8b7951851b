// src/snapshot/snapshotter.rs

//! Turning paths on disk into [`FileSetSnapshot`]s.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::errors::{Result, TaskstateError};
use crate::fs::FileSystem;
use crate::snapshot::fileset::FileSetSnapshot;
use crate::snapshot::fingerprint::FileFingerprint;
use crate::snapshot::hash::compute_file_hash;
use crate::snapshot::paths::{normalize_path, relative_key, resolve, snapshot_key};
use crate::snapshot::patterns::InputPatterns;

/// Produces snapshots for a list of paths, root-relative or absolute.
///
/// Implementations must key entries by normalized path so that the result
/// is independent of the order `paths` is given in.
pub trait Snapshotter: Send + Sync {
    fn snapshot(&self, paths: &[String]) -> Result<FileSetSnapshot>;
}

/// Snapshotter backed by a [`FileSystem`].
///
/// - Files are content-hashed.
/// - Directories are recorded and walked; every file below them becomes an
///   entry of its own.
/// - Paths that do not exist are recorded as [`FileFingerprint::Missing`].
///
/// A file that exists but cannot be read is an error, never a change.
#[derive(Debug, Clone)]
pub struct FileSnapshotter {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl FileSnapshotter {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Snapshot every file under the root matching `patterns`.
    pub fn snapshot_matching(
        &self,
        patterns: &InputPatterns,
        skip: &[String],
    ) -> Result<FileSetSnapshot> {
        let files = patterns
            .collect_matching_files(self.fs.as_ref(), &self.root, skip)
            .map_err(|source| TaskstateError::Snapshot {
                path: self.root.clone(),
                source,
            })?;
        debug!(count = files.len(), root = ?self.root, "collected declared input files");
        self.snapshot(&files)
    }

    fn fingerprint_file(&self, path: &Path) -> Result<FileFingerprint> {
        let (digest, length) = compute_file_hash(self.fs.as_ref(), path).map_err(|source| {
            TaskstateError::Snapshot {
                path: path.to_path_buf(),
                source,
            }
        })?;
        trace!(?path, %digest, length, "hashed file");
        Ok(FileFingerprint::File { digest, length })
    }

    fn walk_dir(&self, dir: &Path, entries: &mut Vec<(String, FileFingerprint)>) -> Result<()> {
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            let children = self
                .fs
                .read_dir(&current)
                .map_err(|source| TaskstateError::Snapshot {
                    path: current.clone(),
                    source,
                })?;
            for child in children {
                let key = relative_key(&self.root, &child)
                    .unwrap_or_else(|| normalize_path(&child.to_string_lossy()));
                if self.fs.is_dir(&child) {
                    entries.push((key, FileFingerprint::Directory));
                    stack.push(child);
                } else if self.fs.is_file(&child) {
                    entries.push((key, self.fingerprint_file(&child)?));
                }
            }
        }
        Ok(())
    }
}

impl Snapshotter for FileSnapshotter {
    fn snapshot(&self, paths: &[String]) -> Result<FileSetSnapshot> {
        let mut entries = Vec::with_capacity(paths.len());

        for raw in paths {
            let key = snapshot_key(&self.root, raw);
            let path = resolve(&self.root, &key);

            if self.fs.is_file(&path) {
                entries.push((key, self.fingerprint_file(&path)?));
            } else if self.fs.is_dir(&path) {
                entries.push((key, FileFingerprint::Directory));
                self.walk_dir(&path, &mut entries)?;
            } else {
                entries.push((key, FileFingerprint::Missing));
            }
        }

        Ok(FileSetSnapshot::from_entries(entries))
    }
}
