// src/analysis/analyzer.rs

//! Pure up-to-date check.
//!
//! [`analyze`] compares what a task looks like now against its last recorded
//! execution. It performs no IO and never touches the history store: the
//! caller snapshots the filesystem first and persists the new record after
//! the task has run.

use std::collections::BTreeSet;

use crate::analysis::verdict::{OutOfDateReason, Verdict};
use crate::history::record::ExecutionRecord;
use crate::implementation::ImplementationIdentity;
use crate::properties::InputProperties;
use crate::snapshot::fileset::{FileChange, FileSetSnapshot};
use crate::snapshot::hash::ContentHash;

/// The state of a task right before it would execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentExecution {
    pub implementation: ImplementationIdentity,
    pub input_properties: InputProperties,
    pub input_files: Option<FileSetSnapshot>,
    /// Re-snapshot of the inputs discovered by the previous execution.
    pub discovered_input_files: Option<FileSetSnapshot>,
    /// Declared output paths (normalized).
    pub output_files: BTreeSet<String>,
    /// What is on disk now under the declared output paths.
    pub output_files_snapshot: Option<FileSetSnapshot>,
}

/// Decide whether a task can be skipped.
///
/// Checks run in a fixed order and stop at the first difference:
///
/// 1. no previous record -> [`Verdict::NoHistory`]
/// 2. implementation identity
/// 3. declared output paths
/// 4. output contents on disk
/// 5. input properties
/// 6. declared input files
/// 7. discovered input files
///
/// The implementation check dominates: with a different implementation the
/// recorded outputs are never trusted, whatever the inputs look like.
pub fn analyze(previous: Option<&ExecutionRecord>, current: &CurrentExecution) -> Verdict {
    let Some(previous) = previous else {
        return Verdict::NoHistory;
    };

    if previous.implementation() != &current.implementation {
        return Verdict::OutOfDate(OutOfDateReason::ImplementationChanged {
            previous: previous.implementation().clone(),
            current: current.implementation.clone(),
        });
    }

    if let Some(reason) = compare_output_paths(previous.output_files(), &current.output_files) {
        return Verdict::OutOfDate(reason);
    }

    if let Some(changes) = compare_file_sets(
        previous.output_files_snapshot(),
        previous.output_files_hash(),
        current.output_files_snapshot.as_ref(),
    ) {
        return Verdict::OutOfDate(OutOfDateReason::OutputsModifiedExternally { changes });
    }

    if previous.input_properties() != &current.input_properties {
        return Verdict::OutOfDate(OutOfDateReason::InputPropertyChanged {
            names: current
                .input_properties
                .changed_since(previous.input_properties()),
        });
    }

    if let Some(changes) = compare_file_sets(
        previous.input_files(),
        previous.input_files_hash(),
        current.input_files.as_ref(),
    ) {
        return Verdict::OutOfDate(OutOfDateReason::InputFilesChanged { changes });
    }

    let previous_discovered = previous.discovered_input_files();
    if let Some(changes) = compare_file_sets(
        previous_discovered,
        previous_discovered.map(FileSetSnapshot::hash),
        current.discovered_input_files.as_ref(),
    ) {
        return Verdict::OutOfDate(OutOfDateReason::DiscoveredInputFilesChanged { changes });
    }

    Verdict::UpToDate
}

fn compare_output_paths(
    previous: &BTreeSet<String>,
    current: &BTreeSet<String>,
) -> Option<OutOfDateReason> {
    if previous == current {
        return None;
    }

    let removed: Vec<String> = previous.difference(current).cloned().collect();
    if !removed.is_empty() {
        return Some(OutOfDateReason::OutputFilesRemoved { paths: removed });
    }

    let added: Vec<String> = current.difference(previous).cloned().collect();
    Some(OutOfDateReason::OutputFilesAdded { paths: added })
}

/// Compare an optional recorded snapshot with an optional current one.
///
/// Absence is treated as the empty set. Returns `None` when both describe the
/// same files. The cached hash only short-cuts the negative case: equal hashes
/// still go through a full comparison, so a hash collision can never turn a
/// change into "up to date".
fn compare_file_sets(
    previous: Option<&FileSetSnapshot>,
    previous_hash: Option<ContentHash>,
    current: Option<&FileSetSnapshot>,
) -> Option<Vec<FileChange>> {
    let empty = FileSetSnapshot::empty();
    let before = previous.unwrap_or(&empty);
    let now = current.unwrap_or(&empty);

    let hashes_differ = match previous_hash {
        Some(hash) => hash != now.hash(),
        None => false,
    };

    if !hashes_differ && before == now {
        return None;
    }

    let changes = now.changes_since(before);
    if changes.is_empty() {
        // Stale cached hash over identical entries; the entries win.
        return None;
    }
    Some(changes)
}
