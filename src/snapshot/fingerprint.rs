// src/snapshot/fingerprint.rs

use serde::{Deserialize, Serialize};

use crate::snapshot::hash::{ContentHash, StableHasher};

/// State of a single path at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FileFingerprint {
    File { digest: ContentHash, length: u64 },
    /// Directories carry no content of their own; their children are
    /// separate entries in the snapshot.
    Directory,
    /// The path was declared but does not exist.
    Missing,
}

impl FileFingerprint {
    pub(crate) fn write_to(&self, hasher: &mut StableHasher) {
        match self {
            FileFingerprint::File { digest, length } => {
                hasher.tag(1).hash(digest).u64(*length);
            }
            FileFingerprint::Directory => {
                hasher.tag(2);
            }
            FileFingerprint::Missing => {
                hasher.tag(3);
            }
        }
    }
}
