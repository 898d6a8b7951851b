// src/snapshot/mod.rs

//! Content snapshots.
//!
//! This module is responsible for:
//! - Hashing file contents (`blake3`).
//! - Normalizing paths into stable snapshot keys.
//! - Building order-independent [`FileSetSnapshot`]s and diffing them.
//! - Compiling the glob patterns that select a task's declared inputs.
//!
//! It does **not** know about tasks or history; it only turns paths on disk
//! into comparable values.

pub mod fileset;
pub mod fingerprint;
pub mod hash;
pub mod paths;
pub mod patterns;
pub mod snapshotter;

pub use fileset::{ChangeKind, FileChange, FileSetSnapshot};
pub use fingerprint::FileFingerprint;
pub use hash::{compute_file_hash, ContentHash, StableHasher};
pub use paths::{normalize_path, relative_key, snapshot_key};
pub use patterns::{InputDefaults, InputPatterns, RawInputSpec};
pub use snapshotter::{FileSnapshotter, Snapshotter};
