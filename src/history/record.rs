// src/history/record.rs

//! The persisted state of one task execution.

use std::collections::BTreeSet;

use crate::errors::{Result, TaskstateError};
use crate::implementation::ImplementationIdentity;
use crate::properties::InputProperties;
use crate::snapshot::fileset::FileSetSnapshot;
use crate::snapshot::hash::ContentHash;
use crate::snapshot::paths::normalize_path;

/// What a task looked like the last time it ran.
///
/// Records are immutable and always fully populated: the only way to build
/// one is [`ExecutionRecordBuilder::build`], which rejects unset fields and
/// derives the cached hashes from their snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    implementation: ImplementationIdentity,
    input_properties: InputProperties,
    input_files: Option<FileSetSnapshot>,
    discovered_input_files: Option<FileSetSnapshot>,
    output_files_snapshot: Option<FileSetSnapshot>,
    input_files_hash: Option<ContentHash>,
    output_files_hash: Option<ContentHash>,
    output_files: BTreeSet<String>,
}

impl ExecutionRecord {
    pub fn builder() -> ExecutionRecordBuilder {
        ExecutionRecordBuilder::default()
    }

    pub fn implementation(&self) -> &ImplementationIdentity {
        &self.implementation
    }

    pub fn input_properties(&self) -> &InputProperties {
        &self.input_properties
    }

    pub fn input_files(&self) -> Option<&FileSetSnapshot> {
        self.input_files.as_ref()
    }

    pub fn discovered_input_files(&self) -> Option<&FileSetSnapshot> {
        self.discovered_input_files.as_ref()
    }

    pub fn output_files_snapshot(&self) -> Option<&FileSetSnapshot> {
        self.output_files_snapshot.as_ref()
    }

    /// Cached hash of [`Self::input_files`].
    pub fn input_files_hash(&self) -> Option<ContentHash> {
        self.input_files_hash
    }

    /// Cached hash of [`Self::output_files_snapshot`].
    pub fn output_files_hash(&self) -> Option<ContentHash> {
        self.output_files_hash
    }

    /// Declared output paths, independent of their content.
    pub fn output_files(&self) -> &BTreeSet<String> {
        &self.output_files
    }

    /// Paths recorded in the discovered input snapshot.
    pub fn discovered_input_paths(&self) -> Vec<String> {
        self.discovered_input_files
            .iter()
            .flat_map(|s| s.paths())
            .map(str::to_string)
            .collect()
    }
}

/// A builder field that must be either set or explicitly marked absent.
#[derive(Debug, Clone, Default)]
enum Slot<T> {
    #[default]
    Unset,
    Set(Option<T>),
}

impl<T> Slot<T> {
    fn take(self, field: &'static str) -> Result<Option<T>> {
        match self {
            Slot::Unset => Err(TaskstateError::IncompleteRecord(field)),
            Slot::Set(value) => Ok(value),
        }
    }
}

/// Assembles an [`ExecutionRecord`] while a task runs.
///
/// Every optional snapshot has to be decided explicitly, either with the
/// setter or with its `no_*` counterpart; a snapshot that was simply forgotten
/// is an error at [`build`](Self::build) time rather than a silent "absent".
#[derive(Debug, Clone, Default)]
pub struct ExecutionRecordBuilder {
    implementation: Option<ImplementationIdentity>,
    input_properties: Option<InputProperties>,
    input_files: Slot<FileSetSnapshot>,
    discovered_input_files: Slot<FileSetSnapshot>,
    output_files_snapshot: Slot<FileSetSnapshot>,
    output_files: Option<BTreeSet<String>>,
}

impl ExecutionRecordBuilder {
    pub fn implementation(mut self, implementation: ImplementationIdentity) -> Self {
        self.implementation = Some(implementation);
        self
    }

    pub fn input_properties(mut self, properties: InputProperties) -> Self {
        self.input_properties = Some(properties);
        self
    }

    pub fn input_files(mut self, snapshot: FileSetSnapshot) -> Self {
        self.input_files = Slot::Set(Some(snapshot));
        self
    }

    pub fn no_input_files(mut self) -> Self {
        self.input_files = Slot::Set(None);
        self
    }

    pub fn discovered_input_files(mut self, snapshot: FileSetSnapshot) -> Self {
        self.discovered_input_files = Slot::Set(Some(snapshot));
        self
    }

    pub fn no_discovered_input_files(mut self) -> Self {
        self.discovered_input_files = Slot::Set(None);
        self
    }

    pub fn output_files_snapshot(mut self, snapshot: FileSetSnapshot) -> Self {
        self.output_files_snapshot = Slot::Set(Some(snapshot));
        self
    }

    pub fn no_output_files_snapshot(mut self) -> Self {
        self.output_files_snapshot = Slot::Set(None);
        self
    }

    /// Declared output paths. Paths are normalized.
    pub fn output_files<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.output_files = Some(
            paths
                .into_iter()
                .map(|p| normalize_path(p.as_ref()))
                .collect(),
        );
        self
    }

    /// Finalize the record.
    ///
    /// Fails if any field was never set, or if a declared output path has no
    /// entry in the output snapshot.
    pub fn build(self) -> Result<ExecutionRecord> {
        let implementation = self
            .implementation
            .ok_or(TaskstateError::IncompleteRecord("implementation"))?;
        let input_properties = self
            .input_properties
            .ok_or(TaskstateError::IncompleteRecord("input_properties"))?;
        let output_files = self
            .output_files
            .ok_or(TaskstateError::IncompleteRecord("output_files"))?;
        let input_files = self.input_files.take("input_files")?;
        let discovered_input_files = self
            .discovered_input_files
            .take("discovered_input_files")?;
        let output_files_snapshot = self.output_files_snapshot.take("output_files_snapshot")?;

        if let Some(snapshot) = &output_files_snapshot {
            if let Some(missing) = output_files.iter().find(|p| !snapshot.contains(p)) {
                return Err(TaskstateError::InconsistentRecord(format!(
                    "declared output '{missing}' has no entry in the output snapshot"
                )));
            }
        }

        Ok(ExecutionRecord {
            input_files_hash: input_files.as_ref().map(FileSetSnapshot::hash),
            output_files_hash: output_files_snapshot.as_ref().map(FileSetSnapshot::hash),
            implementation,
            input_properties,
            input_files,
            discovered_input_files,
            output_files_snapshot,
            output_files,
        })
    }
}
