// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

#[derive(Debug, Default)]
struct MockState {
    entries: BTreeMap<PathBuf, MockEntry>,
    unreadable: BTreeSet<PathBuf>,
    fail_writes: bool,
}

/// In-memory filesystem for tests.
///
/// Paths are compared after dropping `.` components, so `./src/a.rs` and
/// `src/a.rs` refer to the same entry. Parent directories are created
/// implicitly. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

fn key(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = key(path.as_ref());
        let mut state = self.state.lock().unwrap();
        Self::ensure_parents(&mut state, &path);
        state.entries.insert(path, MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = key(path.as_ref());
        let mut state = self.state.lock().unwrap();
        Self::ensure_parents(&mut state, &path);
        state.entries.insert(path, MockEntry::Dir);
    }

    /// Remove a file or a directory together with everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = key(path.as_ref());
        let mut state = self.state.lock().unwrap();
        state.entries.retain(|p, _| !p.starts_with(&path));
    }

    /// Make every read of `path` fail, as an unreadable file would.
    pub fn make_unreadable(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.unreadable.insert(key(path.as_ref()));
    }

    /// Make every subsequent write fail (e.g. to simulate a full disk).
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// Snapshot of all file paths currently present, for assertions.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File(_)))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn ensure_parents(state: &mut MockState, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            state
                .entries
                .entry(dir.to_path_buf())
                .or_insert(MockEntry::Dir);
            current = dir.parent();
        }
    }

    fn file_contents(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        let k = key(path);
        if state.unreadable.contains(&k) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        match state.entries.get(&k) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let content = self.file_contents(path)?;
        String::from_utf8(content).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.file_contents(path)
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let content = self.file_contents(path)?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.state.lock().unwrap().fail_writes {
            return Err(anyhow!("No space left on device: {:?}", path));
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .entries
            .remove(&key(from))
            .ok_or_else(|| anyhow!("File not found: {:?}", from))?;
        let to = key(to);
        Self::ensure_parents(&mut state, &to);
        state.entries.insert(to, entry);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.entries.remove(&key(path)) {
            Some(MockEntry::File(_)) => Ok(()),
            Some(dir) => {
                state.entries.insert(key(path), dir);
                Err(anyhow!("Is a directory: {:?}", path))
            }
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let k = key(path);
        k.as_os_str().is_empty() || self.state.lock().unwrap().entries.contains_key(&k)
    }

    fn is_file(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(&key(path)), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let k = key(path);
        if k.as_os_str().is_empty() {
            return true;
        }
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(&k), Some(MockEntry::Dir))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !self.is_dir(path) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        let dir = key(path);
        let state = self.state.lock().unwrap();
        Ok(state
            .entries
            .keys()
            .filter(|p| p.parent() == Some(dir.as_path()))
            .filter_map(|p| p.file_name())
            .map(|name| path.join(name))
            .collect())
    }
}
