// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::HistoryStorageMode;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// history_dir = ".taskstate/history"
/// storage = "file"
///
/// [default]
/// inputs = ["src/**/*.java"]
/// exclude = ["src/**/generated/**"]
///
/// [task.compileJava]
/// cmd = "javac -d out src/*.java"
/// type = "JavaCompile"
/// outputs = ["out"]
///
/// [task.compileJava.properties]
/// release = 17
/// ```
///
/// All sections except `[task.<name>]` are optional and have defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub default: DefaultSection,

    /// Keys are the task names; they double as task identities.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)` (or the
/// loader), so every `ConfigFile` has passed validation.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    default: DefaultSection,
    task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        default: DefaultSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            config,
            default,
            task,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn default_section(&self) -> &DefaultSection {
        &self.default
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Directory (relative to the project root) holding one history file per
    /// task.
    #[serde(default = "default_history_dir")]
    pub history_dir: String,

    /// `"file"` (default) or `"memory"`.
    #[serde(default)]
    pub storage: HistoryStorageMode,
}

fn default_history_dir() -> String {
    ".taskstate/history".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            history_dir: default_history_dir(),
            storage: HistoryStorageMode::default(),
        }
    }
}

/// `[default]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    /// Default input globs for tasks that do not declare their own.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Default exclude globs for tasks that do not declare their own.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// The command to execute.
    pub cmd: String,

    /// Task type name. Defaults to the task name.
    #[serde(default, rename = "type")]
    pub task_type: Option<String>,

    /// Free-form implementation version; changing it invalidates history
    /// just like changing `cmd` does.
    #[serde(default)]
    pub implementation: Option<String>,

    /// Input globs. If `None`, the task uses `default.inputs`.
    #[serde(default)]
    pub inputs: Option<Vec<String>>,

    /// Exclude globs. If `None`, the task uses `default.exclude`.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,

    /// If true, `default.inputs` is appended to `task.inputs`.
    #[serde(default)]
    pub append_default_inputs: bool,

    /// If true, `default.exclude` is appended to `task.exclude`.
    #[serde(default)]
    pub append_default_exclude: bool,

    /// Declared output paths (files or directories).
    #[serde(default)]
    pub outputs: Vec<String>,

    /// File the command writes the inputs it actually read to, one path per
    /// line.
    #[serde(default)]
    pub discovered_inputs: Option<String>,

    /// Input property values.
    #[serde(default)]
    pub properties: toml::Table,
}

impl TaskConfig {
    pub fn effective_task_type<'a>(&'a self, name: &'a str) -> &'a str {
        self.task_type.as_deref().unwrap_or(name)
    }
}
