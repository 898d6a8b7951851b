// src/history/store.rs

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{Result, TaskstateError};
use crate::fs::FileSystem;
use crate::history::codec::{decode, encode};
use crate::history::record::ExecutionRecord;
use crate::history::storage::{FileStorage, MemoryStorage, StorageBackend};
use crate::types::{HistoryStorageMode, TaskIdentity};

/// Keyed map from task identity to its latest [`ExecutionRecord`].
///
/// Reads never fail: a record that is missing, unreadable, from another
/// schema version or internally inconsistent is reported as absent, which
/// makes the task run again. Writes do fail, but never damage the record
/// they were replacing.
///
/// All methods take `&self`; different identities may be read and written
/// from different threads at the same time.
pub struct HistoryStore {
    backend: Box<dyn StorageBackend>,
}

impl HistoryStore {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    pub fn on_disk(fs: Arc<dyn FileSystem>, dir: impl AsRef<Path>) -> Self {
        Self::new(Box::new(FileStorage::new(fs, dir.as_ref())))
    }

    pub fn from_mode(mode: HistoryStorageMode, fs: Arc<dyn FileSystem>, dir: &Path) -> Self {
        match mode {
            HistoryStorageMode::File => Self::on_disk(fs, dir),
            HistoryStorageMode::Memory => Self::in_memory(),
        }
    }

    /// Latest record for `task`, or `None` if there is no usable one.
    pub fn get(&self, task: &TaskIdentity) -> Option<ExecutionRecord> {
        let bytes = match self.backend.read(task.as_str()) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(task = %task, "no execution history");
                return None;
            }
            Err(e) => {
                warn!(task = %task, error = %e, "could not read execution history; ignoring it");
                return None;
            }
        };

        match decode(task, &bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(task = %task, error = %e, "discarding unusable execution history");
                None
            }
        }
    }

    /// Persist `record` as the latest execution of `task`.
    pub fn put(&self, task: &TaskIdentity, record: &ExecutionRecord) -> Result<()> {
        let bytes = encode(task, record).map_err(|e| TaskstateError::StoreWrite {
            task: task.clone(),
            source: e.into(),
        })?;
        self.backend
            .write(task.as_str(), &bytes)
            .map_err(|source| TaskstateError::StoreWrite {
                task: task.clone(),
                source,
            })?;
        debug!(task = %task, "recorded execution");
        Ok(())
    }

    /// Forget the history of `task`; its next evaluation reports no history.
    pub fn invalidate(&self, task: &TaskIdentity) -> Result<()> {
        self.backend.remove(task.as_str())?;
        info!(task = %task, "invalidated execution history");
        Ok(())
    }

    /// Identities with a stored record (usable or not).
    pub fn tasks(&self) -> Result<Vec<TaskIdentity>> {
        Ok(self
            .backend
            .keys()?
            .into_iter()
            .map(TaskIdentity::from)
            .collect())
    }

    /// Forget every record.
    pub fn clear(&self) -> Result<usize> {
        let tasks = self.tasks()?;
        for task in &tasks {
            self.backend.remove(task.as_str())?;
        }
        info!(removed = tasks.len(), "cleared execution history");
        Ok(tasks.len())
    }

    /// Remove records for tasks that are not in `active`.
    pub fn prune(&self, active: &[TaskIdentity]) -> Result<usize> {
        let mut removed = 0;
        for task in self.tasks()? {
            if !active.contains(&task) {
                self.backend.remove(task.as_str())?;
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "pruned stale execution history");
        }
        Ok(removed)
    }
}
