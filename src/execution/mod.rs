// src/execution/mod.rs

//! Task execution: declarations, the per-build context, the process runner
//! and the build loop tying them together.

pub mod build;
pub mod context;
pub mod runner;

pub use build::{execute, BuildOptions, BuildSummary, TaskReport, TaskResult};
pub use context::{declarations_from_config, Evaluation, ExecutionContext, TaskDeclaration};
pub use runner::{ShellRunner, TaskOutcome, TaskRunner};
