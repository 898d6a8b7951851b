// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskstate`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskstate",
    version,
    about = "Run tasks whose inputs, outputs or implementation changed since the last run.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Taskstate.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Taskstate.toml")]
    pub config: String,

    /// Only consider this task. May be given more than once.
    ///
    /// If omitted, every task in the config is considered.
    #[arg(long = "task", value_name = "NAME")]
    pub tasks: Vec<String>,

    /// Report which tasks are out of date and why, without running anything.
    #[arg(long)]
    pub status: bool,

    /// Run the selected tasks even if they are up to date.
    #[arg(long, conflicts_with = "status")]
    pub force: bool,

    /// Delete recorded history (of the selected tasks, or all) and exit.
    #[arg(long, conflicts_with_all = ["status", "force"])]
    pub clean_history: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKSTATE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print tasks, but don't evaluate or execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
