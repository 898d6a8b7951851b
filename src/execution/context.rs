// src/execution/context.rs

//! Glue between the analyzer, the snapshotter and the history store.
//!
//! [`ExecutionContext`] is what a build loop talks to: it turns a
//! [`TaskDeclaration`] into a [`CurrentExecution`] by snapshotting the
//! filesystem, asks the analyzer for a verdict, and persists the new record
//! once the task body has run.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::analysis::{analyze, CurrentExecution, Verdict};
use crate::config::model::{ConfigFile, TaskConfig};
use crate::config::validate::input_spec;
use crate::errors::{Result, TaskstateError};
use crate::history::record::{ExecutionRecord, ExecutionRecordBuilder};
use crate::history::store::HistoryStore;
use crate::implementation::ImplementationIdentity;
use crate::properties::InputProperties;
use crate::snapshot::fileset::FileSetSnapshot;
use crate::snapshot::paths::{normalize_path, resolve};
use crate::snapshot::patterns::{InputDefaults, InputPatterns};
use crate::snapshot::snapshotter::{FileSnapshotter, Snapshotter};
use crate::types::TaskIdentity;

/// Everything known about a task before it runs.
#[derive(Debug, Clone)]
pub struct TaskDeclaration {
    pub identity: TaskIdentity,
    pub cmd: String,
    pub implementation: ImplementationIdentity,
    pub input_properties: InputProperties,
    /// `None` when the task declares no file inputs.
    pub inputs: Option<InputPatterns>,
    pub output_files: BTreeSet<String>,
    /// Root-relative file listing discovered inputs after the task ran.
    pub discovered_inputs_file: Option<String>,
}

impl TaskDeclaration {
    pub fn from_config(name: &str, cfg: &TaskConfig, defaults: &InputDefaults) -> Result<Self> {
        let inputs = InputPatterns::compile(defaults, &input_spec(cfg)).map_err(|e| {
            TaskstateError::ConfigError(format!("task '{}' has invalid input patterns: {:#}", name, e))
        })?;

        Ok(Self {
            identity: TaskIdentity::from(name),
            cmd: cfg.cmd.clone(),
            implementation: ImplementationIdentity::for_command(
                cfg.effective_task_type(name),
                &cfg.cmd,
                cfg.implementation.as_deref(),
            ),
            input_properties: InputProperties::from_toml_table(&cfg.properties)?,
            inputs,
            output_files: cfg.outputs.iter().map(|o| normalize_path(o)).collect(),
            discovered_inputs_file: cfg.discovered_inputs.as_deref().map(normalize_path),
        })
    }
}

/// Declarations for every task in `cfg`, in name order.
pub fn declarations_from_config(cfg: &ConfigFile) -> Result<Vec<TaskDeclaration>> {
    let defaults = InputDefaults {
        inputs: cfg.default_section().inputs.clone(),
        exclude: cfg.default_section().exclude.clone(),
    };
    cfg.tasks()
        .iter()
        .map(|(name, task)| TaskDeclaration::from_config(name, task, &defaults))
        .collect()
}

/// Result of [`ExecutionContext::evaluate`].
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub verdict: Verdict,
    /// The state the verdict was computed from; reused when recording.
    pub current: CurrentExecution,
}

/// Per-build services for evaluating and recording task executions.
///
/// Holds no per-task state, so one context can serve tasks on several
/// threads at once.
pub struct ExecutionContext {
    history: HistoryStore,
    snapshotter: FileSnapshotter,
    skip_dirs: Vec<String>,
}

impl ExecutionContext {
    pub fn new(history: HistoryStore, snapshotter: FileSnapshotter) -> Self {
        Self {
            history,
            snapshotter,
            skip_dirs: Vec::new(),
        }
    }

    /// Never treat files below `dir` (root-relative) as declared inputs.
    pub fn skip_dir(mut self, dir: &str) -> Self {
        self.skip_dirs.push(normalize_path(dir));
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn root(&self) -> &Path {
        self.snapshotter.root()
    }

    /// Snapshot the current state of `decl`.
    ///
    /// Discovered inputs can only be known from history: the files listed by
    /// `previous` are snapshotted again so the analyzer can compare them.
    pub fn current_execution(
        &self,
        decl: &TaskDeclaration,
        previous: Option<&ExecutionRecord>,
    ) -> Result<CurrentExecution> {
        let input_files = match &decl.inputs {
            Some(patterns) => Some(self.snapshotter.snapshot_matching(patterns, &self.skip_dirs)?),
            None => None,
        };

        let output_files_snapshot = self.snapshot_outputs(decl)?;

        let discovered_input_files = match previous.and_then(|p| p.discovered_input_files()) {
            Some(recorded) => {
                let paths: Vec<String> = recorded.paths().map(str::to_string).collect();
                Some(self.snapshotter.snapshot(&paths)?)
            }
            None => None,
        };

        Ok(CurrentExecution {
            implementation: decl.implementation.clone(),
            input_properties: decl.input_properties.clone(),
            input_files,
            discovered_input_files,
            output_files: decl.output_files.clone(),
            output_files_snapshot,
        })
    }

    /// Decide whether `decl` has to run.
    ///
    /// Unusable history is reported as [`Verdict::NoHistory`]. A file that
    /// cannot be read while snapshotting is an error.
    pub fn evaluate(&self, decl: &TaskDeclaration) -> Result<Evaluation> {
        let previous = self.history.get(&decl.identity);
        let current = self.current_execution(decl, previous.as_ref())?;
        let verdict = analyze(previous.as_ref(), &current);

        match &verdict {
            Verdict::UpToDate => info!(task = %decl.identity, "up to date"),
            Verdict::NoHistory => info!(task = %decl.identity, "no history; task will execute"),
            Verdict::OutOfDate(reason) => {
                info!(task = %decl.identity, reason = %reason, "out of date")
            }
        }

        Ok(Evaluation { verdict, current })
    }

    /// Persist `record` as the latest execution of `task`.
    pub fn record_execution(&self, task: &TaskIdentity, record: &ExecutionRecord) -> Result<()> {
        self.history.put(task, record)
    }

    /// Build and persist the record for a task whose body just ran.
    ///
    /// Outputs are snapshotted again (they were just produced) and the
    /// discovered-inputs file, if declared, is read and snapshotted.
    pub fn complete_execution(
        &self,
        decl: &TaskDeclaration,
        current: &CurrentExecution,
    ) -> Result<ExecutionRecord> {
        let outputs = self.snapshot_outputs(decl)?;
        let discovered = self.read_discovered_inputs(decl)?;

        let builder = base_builder(current);
        let builder = match outputs {
            Some(s) => builder.output_files_snapshot(s),
            None => builder.no_output_files_snapshot(),
        };
        let builder = match discovered {
            Some(s) => builder.discovered_input_files(s),
            None => builder.no_discovered_input_files(),
        };

        let record = builder.build()?;
        self.record_execution(&decl.identity, &record)?;
        Ok(record)
    }

    /// Re-record a task that was skipped as up to date.
    pub fn complete_up_to_date(
        &self,
        decl: &TaskDeclaration,
        current: &CurrentExecution,
    ) -> Result<ExecutionRecord> {
        let builder = base_builder(current);
        let builder = match &current.output_files_snapshot {
            Some(s) => builder.output_files_snapshot(s.clone()),
            None => builder.no_output_files_snapshot(),
        };
        let builder = match &current.discovered_input_files {
            Some(s) => builder.discovered_input_files(s.clone()),
            None => builder.no_discovered_input_files(),
        };

        let record = builder.build()?;
        self.record_execution(&decl.identity, &record)?;
        Ok(record)
    }

    /// Forget the history of a task whose execution failed, so its next
    /// evaluation does not trust partially written outputs.
    pub fn discard_history(&self, task: &TaskIdentity) -> Result<()> {
        self.history.invalidate(task)
    }

    fn snapshot_outputs(&self, decl: &TaskDeclaration) -> Result<Option<FileSetSnapshot>> {
        if decl.output_files.is_empty() {
            return Ok(None);
        }
        let paths: Vec<String> = decl.output_files.iter().cloned().collect();
        self.snapshotter.snapshot(&paths).map(Some)
    }

    fn read_discovered_inputs(&self, decl: &TaskDeclaration) -> Result<Option<FileSetSnapshot>> {
        let Some(depfile) = &decl.discovered_inputs_file else {
            return Ok(None);
        };

        let path = resolve(self.root(), depfile);
        let fs = self.snapshotter.fs();
        if !fs.is_file(&path) {
            warn!(
                task = %decl.identity,
                file = %depfile,
                "task did not write its discovered inputs file"
            );
            return Ok(None);
        }

        let contents = fs
            .read_to_string(&path)
            .map_err(|source| TaskstateError::Snapshot {
                path: path.clone(),
                source,
            })?;
        let paths = parse_discovered_inputs(&contents);
        debug!(task = %decl.identity, count = paths.len(), "read discovered inputs");
        self.snapshotter.snapshot(&paths).map(Some)
    }
}

fn base_builder(current: &CurrentExecution) -> ExecutionRecordBuilder {
    let builder = ExecutionRecord::builder()
        .implementation(current.implementation.clone())
        .input_properties(current.input_properties.clone())
        .output_files(&current.output_files);
    match &current.input_files {
        Some(s) => builder.input_files(s.clone()),
        None => builder.no_input_files(),
    }
}

/// One path per line; blank lines and `#` comments are ignored.
pub fn parse_discovered_inputs(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(normalize_path)
        .collect()
}
