// src/history/storage.rs

//! Byte-level storage backends for execution history.
//!
//! A backend knows nothing about records; it maps string keys to opaque
//! bytes and guarantees that a `write` either fully replaces the previous
//! value or leaves it untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use crate::fs::FileSystem;

/// Abstract durable key/value storage.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// Replace the value for `key` atomically.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

/// Stores values in memory only.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.map
            .lock()
            .map_err(|_| anyhow!("memory storage lock poisoned"))
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.lock()?.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

const RECORD_EXTENSION: &str = ".json";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stores one file per key in a directory.
///
/// Writes go to a temporary sibling first and are renamed over the target,
/// so a crash mid-write leaves either the old file or the new one, never a
/// torn mix.
#[derive(Debug, Clone)]
pub struct FileStorage {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", encode_key(key), RECORD_EXTENSION))
    }
}

/// Removes the temporary file on drop unless the write was committed.
struct PendingWrite<'a> {
    fs: &'a dyn FileSystem,
    path: PathBuf,
    committed: bool,
}

impl PendingWrite<'_> {
    fn commit(mut self, target: &Path) -> Result<()> {
        self.fs.rename(&self.path, target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PendingWrite<'_> {
    fn drop(&mut self) {
        if !self.committed && self.fs.exists(&self.path) {
            if let Err(e) = self.fs.remove_file(&self.path) {
                warn!(path = ?self.path, error = %e, "failed to clean up temporary history file");
            }
        }
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        if !self.fs.is_file(&path) {
            return Ok(None);
        }
        let bytes = self
            .fs
            .read(&path)
            .with_context(|| format!("reading history file {:?}", path))?;
        Ok(Some(bytes))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let target = self.path_for(key);
        let tmp = self.dir.join(format!(
            "{}{}.tmp-{}-{}",
            encode_key(key),
            RECORD_EXTENSION,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let pending = PendingWrite {
            fs: self.fs.as_ref(),
            path: tmp,
            committed: false,
        };
        self.fs
            .write(&pending.path, bytes)
            .with_context(|| format!("writing temporary history file {:?}", pending.path))?;
        pending
            .commit(&target)
            .with_context(|| format!("committing history file {:?}", target))?;
        debug!(path = ?target, bytes = bytes.len(), "wrote history file");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if self.fs.is_file(&path) {
            self.fs.remove_file(&path)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        if !self.fs.is_dir(&self.dir) {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for path in self.fs.read_dir(&self.dir)? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(encoded) = name.strip_suffix(RECORD_EXTENSION) else {
                continue;
            };
            match decode_key(encoded) {
                Some(key) => keys.push(key),
                None => warn!(file = %name, "ignoring unrecognised file in history directory"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Percent-encode a key into a portable file name.
///
/// Only ASCII alphanumerics, `-` and `_` pass through, so the encoded name
/// never contains a `.` and cannot clash with the record extension.
pub fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

pub fn decode_key(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_file_names() {
        for key in [":app:compileJava", "a b/c", "plain", "ünïcode"] {
            let encoded = encode_key(key);
            assert!(!encoded.contains('.') && !encoded.contains('/'));
            assert_eq!(decode_key(&encoded).as_deref(), Some(key));
        }
    }
}
