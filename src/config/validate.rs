// src/config/validate.rs

use std::collections::BTreeSet;
use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig};
use crate::errors::{Result, TaskstateError};
use crate::properties::InputProperties;
use crate::snapshot::paths::normalize_path;
use crate::snapshot::patterns::{InputDefaults, InputPatterns, RawInputSpec};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskstateError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.default, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;

    let defaults = InputDefaults {
        inputs: cfg.default.inputs.clone(),
        exclude: cfg.default.exclude.clone(),
    };
    for (name, task) in cfg.task.iter() {
        validate_task(name, task, &defaults)?;
    }
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskstateError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if normalize_path(&cfg.config.history_dir).is_empty() {
        return Err(TaskstateError::ConfigError(
            "[config].history_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_task(name: &str, task: &TaskConfig, defaults: &InputDefaults) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TaskstateError::ConfigError(
            "task names must not be empty".to_string(),
        ));
    }

    if task.cmd.trim().is_empty() {
        return Err(TaskstateError::ConfigError(format!(
            "task '{}' has an empty `cmd`",
            name
        )));
    }

    validate_outputs(name, &task.outputs)?;

    InputPatterns::compile(defaults, &input_spec(task)).map_err(|e| {
        TaskstateError::ConfigError(format!("task '{}' has invalid input patterns: {:#}", name, e))
    })?;

    if let Some(depfile) = &task.discovered_inputs {
        if normalize_path(depfile).is_empty() {
            return Err(TaskstateError::ConfigError(format!(
                "task '{}' has an empty `discovered_inputs` path",
                name
            )));
        }
    }

    // Unsupported property values are reported here, when the task is
    // declared, rather than when it is hashed.
    InputProperties::from_toml_table(&task.properties)?;

    Ok(())
}

fn validate_outputs(name: &str, outputs: &[String]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for output in outputs {
        let normalized = normalize_path(output);
        if normalized.is_empty() {
            return Err(TaskstateError::ConfigError(format!(
                "task '{}' declares an empty output path",
                name
            )));
        }
        if Path::new(output).is_absolute() {
            return Err(TaskstateError::ConfigError(format!(
                "task '{}' declares absolute output '{}'; outputs must be relative to the project root",
                name, output
            )));
        }
        if normalized.split('/').any(|seg| seg == "..") {
            return Err(TaskstateError::ConfigError(format!(
                "task '{}' declares output '{}' outside the project root",
                name, output
            )));
        }
        if !seen.insert(normalized) {
            return Err(TaskstateError::ConfigError(format!(
                "task '{}' declares output '{}' more than once",
                name, output
            )));
        }
    }
    Ok(())
}

/// Map a task's input settings onto the pattern compiler's input.
pub(crate) fn input_spec(task: &TaskConfig) -> RawInputSpec {
    RawInputSpec {
        inputs: task.inputs.clone(),
        exclude: task.exclude.clone(),
        append_default_inputs: task.append_default_inputs,
        append_default_exclude: task.append_default_exclude,
    }
}
