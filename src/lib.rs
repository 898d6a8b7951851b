// src/lib.rs

pub mod analysis;
pub mod cli;
pub mod config;
pub mod errors;
pub mod execution;
pub mod fs;
pub mod history;
pub mod implementation;
pub mod logging;
pub mod properties;
pub mod snapshot;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::errors::TaskstateError;
use crate::execution::{
    declarations_from_config, execute, BuildOptions, ExecutionContext, ShellRunner,
    TaskDeclaration,
};
use crate::fs::{FileSystem, RealFileSystem};
use crate::history::HistoryStore;
use crate::snapshot::paths::snapshot_key;
use crate::snapshot::FileSnapshotter;
use crate::types::TaskIdentity;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the history store and snapshotter
/// - the build loop with the shell runner
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let root = config_root_dir(&config_path);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let history_dir = cfg.config_section().history_dir.clone();
    let store = HistoryStore::from_mode(
        cfg.config_section().storage,
        Arc::clone(&fs),
        &root.join(&history_dir),
    );

    let declarations = declarations_from_config(&cfg)?;
    let selected = select_tasks(declarations, &args.tasks)?;

    if args.clean_history {
        clean_history(&store, &selected, !args.tasks.is_empty())?;
        return Ok(());
    }

    if args.tasks.is_empty() && !args.status {
        let active: Vec<TaskIdentity> = selected.iter().map(|d| d.identity.clone()).collect();
        let pruned = store.prune(&active)?;
        if pruned > 0 {
            info!(pruned, "removed history of tasks no longer declared");
        }
    }

    let history_key = snapshot_key(&root, &history_dir);
    let ctx = ExecutionContext::new(store, FileSnapshotter::new(fs, root)).skip_dir(&history_key);

    let options = BuildOptions {
        force: args.force,
        status_only: args.status,
    };
    let mut runner = ShellRunner;
    let summary = execute(&selected, &ctx, &mut runner, options).await;

    for report in &summary.reports {
        println!("{report}");
    }

    if !summary.is_success() {
        let failed: Vec<&str> = summary.failed().into_iter().map(TaskIdentity::as_str).collect();
        bail!("{} task(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

/// Keep only the declarations named in `names` (all of them if empty),
/// preserving declaration order.
fn select_tasks(
    declarations: Vec<TaskDeclaration>,
    names: &[String],
) -> errors::Result<Vec<TaskDeclaration>> {
    if names.is_empty() {
        return Ok(declarations);
    }

    for name in names {
        if !declarations.iter().any(|d| d.identity.as_str() == name) {
            return Err(TaskstateError::ConfigError(format!(
                "unknown task '{}'",
                name
            )));
        }
    }

    Ok(declarations
        .into_iter()
        .filter(|d| names.iter().any(|n| n == d.identity.as_str()))
        .collect())
}

fn clean_history(
    store: &HistoryStore,
    selected: &[TaskDeclaration],
    only_selected: bool,
) -> errors::Result<()> {
    if only_selected {
        for decl in selected {
            store.invalidate(&decl.identity)?;
            println!("cleared history of {}", decl.identity);
        }
    } else {
        let removed = store.clear()?;
        println!("cleared {removed} history record(s)");
    }
    Ok(())
}

/// Project root: the directory containing the config file.
///
/// - If the config path has a non-empty parent (e.g. "build/Taskstate.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Taskstate.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print tasks with their declared inputs and outputs.
fn print_dry_run(cfg: &ConfigFile) {
    println!("taskstate dry-run");
    println!("  config.history_dir = {}", cfg.config_section().history_dir);
    println!("  config.storage = {:?}", cfg.config_section().storage);
    println!();

    println!("tasks ({}):", cfg.tasks().len());
    for (name, task) in cfg.tasks().iter() {
        println!("  - {name}");
        println!("      cmd: {}", task.cmd);
        println!("      type: {}", task.effective_task_type(name));
        if let Some(ref version) = task.implementation {
            println!("      implementation: {version}");
        }
        if let Some(ref inputs) = task.inputs {
            if !inputs.is_empty() {
                println!("      inputs: {:?}", inputs);
            }
        }
        if let Some(ref exclude) = task.exclude {
            if !exclude.is_empty() {
                println!("      exclude: {:?}", exclude);
            }
        }
        if !task.outputs.is_empty() {
            println!("      outputs: {:?}", task.outputs);
        }
        if let Some(ref depfile) = task.discovered_inputs {
            println!("      discovered_inputs: {depfile}");
        }
        if !task.properties.is_empty() {
            let names: Vec<&String> = task.properties.keys().collect();
            println!("      properties: {:?}", names);
        }
    }

    debug!("dry-run complete (no execution)");
}
