// src/history/codec.rs

//! On-disk layout of an [`ExecutionRecord`].
//!
//! Records are stored as JSON documents tagged with [`SCHEMA_VERSION`].
//! Cached hashes are written next to their snapshots and re-derived on read;
//! any disagreement means the record cannot be trusted.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::record::ExecutionRecord;
use crate::implementation::ImplementationIdentity;
use crate::properties::InputProperties;
use crate::snapshot::fileset::FileSetSnapshot;
use crate::snapshot::fingerprint::FileFingerprint;
use crate::snapshot::hash::ContentHash;
use crate::types::TaskIdentity;

/// Bump whenever the persisted layout changes. Records written with any other
/// version are ignored.
pub const SCHEMA_VERSION: u32 = 1;

/// Why a stored record was rejected.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("schema version {found} does not match expected {expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("record belongs to task '{found}'")]
    WrongTask { found: TaskIdentity },

    #[error("stored {field} hash does not match its snapshot")]
    HashMismatch { field: &'static str },

    #[error("invalid record: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedFileSet {
    entries: BTreeMap<String, FileFingerprint>,
    hash: ContentHash,
    path_set_hash: ContentHash,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedRecord {
    schema_version: u32,
    task: TaskIdentity,
    implementation: ImplementationIdentity,
    input_properties: InputProperties,
    input_files: Option<PersistedFileSet>,
    input_files_hash: Option<ContentHash>,
    discovered_input_files: Option<PersistedFileSet>,
    output_files_snapshot: Option<PersistedFileSet>,
    output_files_hash: Option<ContentHash>,
    output_files: BTreeSet<String>,
}

#[derive(Deserialize)]
struct SchemaProbe {
    schema_version: u32,
}

fn persist_file_set(snapshot: &FileSetSnapshot) -> PersistedFileSet {
    PersistedFileSet {
        entries: snapshot.entries().clone(),
        hash: snapshot.hash(),
        path_set_hash: snapshot.path_set_hash(),
    }
}

fn restore_file_set(
    persisted: PersistedFileSet,
    field: &'static str,
) -> Result<FileSetSnapshot, DecodeError> {
    let snapshot = FileSetSnapshot::from_entries(persisted.entries);
    if snapshot.hash() != persisted.hash || snapshot.path_set_hash() != persisted.path_set_hash {
        return Err(DecodeError::HashMismatch { field });
    }
    Ok(snapshot)
}

/// Serialize `record` for `task`.
pub fn encode(task: &TaskIdentity, record: &ExecutionRecord) -> serde_json::Result<Vec<u8>> {
    let persisted = PersistedRecord {
        schema_version: SCHEMA_VERSION,
        task: task.clone(),
        implementation: record.implementation().clone(),
        input_properties: record.input_properties().clone(),
        input_files: record.input_files().map(persist_file_set),
        input_files_hash: record.input_files_hash(),
        discovered_input_files: record.discovered_input_files().map(persist_file_set),
        output_files_snapshot: record.output_files_snapshot().map(persist_file_set),
        output_files_hash: record.output_files_hash(),
        output_files: record.output_files().clone(),
    };
    serde_json::to_vec_pretty(&persisted)
}

/// Deserialize and verify a record stored for `task`.
pub fn decode(task: &TaskIdentity, bytes: &[u8]) -> Result<ExecutionRecord, DecodeError> {
    // Check the version before the full parse so that a layout change is
    // reported as such instead of as a parse error.
    let probe: SchemaProbe = serde_json::from_slice(bytes)?;
    if probe.schema_version != SCHEMA_VERSION {
        return Err(DecodeError::SchemaMismatch {
            found: probe.schema_version,
            expected: SCHEMA_VERSION,
        });
    }

    let persisted: PersistedRecord = serde_json::from_slice(bytes)?;
    if persisted.task != *task {
        return Err(DecodeError::WrongTask {
            found: persisted.task,
        });
    }

    let input_files = persisted
        .input_files
        .map(|s| restore_file_set(s, "input files"))
        .transpose()?;
    let discovered = persisted
        .discovered_input_files
        .map(|s| restore_file_set(s, "discovered input files"))
        .transpose()?;
    let outputs = persisted
        .output_files_snapshot
        .map(|s| restore_file_set(s, "output files"))
        .transpose()?;

    let mut builder = ExecutionRecord::builder()
        .implementation(persisted.implementation)
        .input_properties(persisted.input_properties)
        .output_files(persisted.output_files);
    builder = match input_files {
        Some(s) => builder.input_files(s),
        None => builder.no_input_files(),
    };
    builder = match discovered {
        Some(s) => builder.discovered_input_files(s),
        None => builder.no_discovered_input_files(),
    };
    builder = match outputs {
        Some(s) => builder.output_files_snapshot(s),
        None => builder.no_output_files_snapshot(),
    };

    let record = builder
        .build()
        .map_err(|e| DecodeError::Invalid(e.to_string()))?;

    if record.input_files_hash() != persisted.input_files_hash {
        return Err(DecodeError::HashMismatch {
            field: "input files",
        });
    }
    if record.output_files_hash() != persisted.output_files_hash {
        return Err(DecodeError::HashMismatch {
            field: "output files",
        });
    }

    Ok(record)
}
