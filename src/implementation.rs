// src/implementation.rs

//! Identity of the logic a task runs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::hash::{ContentHash, StableHasher};

/// Version of this tool, folded into every command-derived identity so that
/// upgrading the tool invalidates history recorded by an older one.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// What a task *is*: its type name plus a hash of the code that implements it.
///
/// A change in either part means the task's behavior itself may differ, so
/// recorded outputs can no longer be trusted even if every input is
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationIdentity {
    task_type: String,
    hash: ContentHash,
}

impl ImplementationIdentity {
    pub fn new(task_type: impl Into<String>, hash: ContentHash) -> Self {
        Self {
            task_type: task_type.into(),
            hash,
        }
    }

    /// Identity of a shell-command task.
    ///
    /// The hash covers the tool version, the command line and the optional
    /// user-declared implementation version.
    pub fn for_command(task_type: impl Into<String>, cmd: &str, version: Option<&str>) -> Self {
        let mut hasher = StableHasher::new();
        hasher.str(TOOL_VERSION).str(cmd);
        match version {
            Some(v) => hasher.tag(1).str(v),
            None => hasher.tag(0),
        };
        Self::new(task_type, hasher.finish())
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }
}

impl fmt::Display for ImplementationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.task_type, &self.hash.to_hex()[..12])
    }
}
