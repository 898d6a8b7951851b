// src/snapshot/fileset.rs

//! Order-independent snapshot of a set of files.

use std::collections::BTreeMap;
use std::fmt;

use crate::snapshot::fingerprint::FileFingerprint;
use crate::snapshot::hash::{ContentHash, StableHasher};
use crate::snapshot::paths::normalize_path;

/// State of a set of files at one point in time.
///
/// Entries are keyed by normalized relative path, so two snapshots built
/// from the same files enumerated in different orders are equal and hash
/// identically. Renames show up as a removal plus an addition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSetSnapshot {
    entries: BTreeMap<String, FileFingerprint>,
}

/// How a single path differs between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub kind: ChangeKind,
}

impl fmt::Display for FileChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::Modified => "modified",
        };
        write!(f, "{} {}", self.path, verb)
    }
}

impl FileSetSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from `(path, fingerprint)` pairs in any order.
    ///
    /// Paths are normalized; if the same normalized path appears twice the
    /// last fingerprint wins.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, FileFingerprint)>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(path, fp)| (normalize_path(path.as_ref()), fp))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FileFingerprint> {
        self.entries.get(&normalize_path(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize_path(path))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileFingerprint)> {
        self.entries.iter().map(|(p, fp)| (p.as_str(), fp))
    }

    pub(crate) fn entries(&self) -> &BTreeMap<String, FileFingerprint> {
        &self.entries
    }

    /// Combined hash over every path and its fingerprint.
    ///
    /// Entries are fed in path order, so the result does not depend on the
    /// order the files were discovered in.
    pub fn hash(&self) -> ContentHash {
        let mut hasher = StableHasher::new();
        hasher.u64(self.entries.len() as u64);
        for (path, fp) in &self.entries {
            hasher.str(path);
            fp.write_to(&mut hasher);
        }
        hasher.finish()
    }

    /// Fingerprint of the path set alone (cardinality and names), ignoring
    /// content.
    pub fn path_set_hash(&self) -> ContentHash {
        let mut hasher = StableHasher::new();
        hasher.u64(self.entries.len() as u64);
        for path in self.entries.keys() {
            hasher.str(path);
        }
        hasher.finish()
    }

    /// List the paths that differ from `previous`, in path order.
    pub fn changes_since(&self, previous: &FileSetSnapshot) -> Vec<FileChange> {
        let mut changes = Vec::new();

        for (path, before) in &previous.entries {
            match self.entries.get(path) {
                None => changes.push(FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Removed,
                }),
                Some(now) if now != before => changes.push(FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Modified,
                }),
                Some(_) => {}
            }
        }

        for path in self.entries.keys() {
            if !previous.entries.contains_key(path) {
                changes.push(FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Added,
                });
            }
        }

        changes.sort_by(|a, b| a.path.cmp(&b.path));
        changes
    }
}
