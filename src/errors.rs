// src/errors.rs

//! Crate-wide error type.
//!
//! Collaborator layers (filesystem, storage backends) report failures as
//! `anyhow::Error` with context attached; the engine-facing operations map
//! them into [`TaskstateError`] so callers can tell a configuration mistake
//! from an unreadable input file or a failed history write.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::TaskIdentity;

#[derive(Error, Debug)]
pub enum TaskstateError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A file could not be read while computing a snapshot.
    ///
    /// This is never downgraded to "changed": the task fails instead.
    #[error("failed to snapshot {path:?}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("unsupported value for input property '{name}': {detail}")]
    UnsupportedProperty { name: String, detail: String },

    #[error("execution record is incomplete: `{0}` was never set")]
    IncompleteRecord(&'static str),

    #[error("execution record is inconsistent: {0}")]
    InconsistentRecord(String),

    #[error("failed to write execution history for task '{task}': {source}")]
    StoreWrite {
        task: TaskIdentity,
        #[source]
        source: anyhow::Error,
    },

    #[error("task '{task}' failed with exit code {code}")]
    TaskFailed { task: TaskIdentity, code: i32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskstateError>;
