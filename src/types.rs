// src/types.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable key identifying a task across builds (e.g. `":app:compileJava"`).
///
/// Used as the history store key. Two unrelated tasks in one build must never
/// share an identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskIdentity(String);

impl TaskIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TaskIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Where execution history is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStorageMode {
    /// One file per task under `[config].history_dir`.
    File,
    /// In memory only (lost on exit). Every build starts without history.
    Memory,
}

impl Default for HistoryStorageMode {
    fn default() -> Self {
        HistoryStorageMode::File
    }
}
