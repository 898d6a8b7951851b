#![allow(dead_code)]

use std::collections::BTreeMap;
use taskstate::config::{ConfigFile, ConfigSection, DefaultSection, RawConfigFile, TaskConfig};
use taskstate::types::HistoryStorageMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_default_input(mut self, pattern: &str) -> Self {
        self.config.default.inputs.push(pattern.to_string());
        self
    }

    pub fn with_default_exclude(mut self, pattern: &str) -> Self {
        self.config.default.exclude.push(pattern.to_string());
        self
    }

    pub fn history_dir(mut self, dir: &str) -> Self {
        self.config.config.history_dir = dir.to_string();
        self
    }

    pub fn storage(mut self, mode: HistoryStorageMode) -> Self {
        self.config.config.storage = mode;
        self
    }

    /// The unvalidated config, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                task_type: None,
                implementation: None,
                inputs: None,
                exclude: None,
                append_default_inputs: false,
                append_default_exclude: false,
                outputs: vec![],
                discovered_inputs: None,
                properties: toml::Table::new(),
            },
        }
    }

    pub fn task_type(mut self, name: &str) -> Self {
        self.task.task_type = Some(name.to_string());
        self
    }

    pub fn implementation(mut self, version: &str) -> Self {
        self.task.implementation = Some(version.to_string());
        self
    }

    pub fn input(mut self, pattern: &str) -> Self {
        let inputs = self.task.inputs.get_or_insert(vec![]);
        inputs.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        let excludes = self.task.exclude.get_or_insert(vec![]);
        excludes.push(pattern.to_string());
        self
    }

    pub fn append_default_inputs(mut self, val: bool) -> Self {
        self.task.append_default_inputs = val;
        self
    }

    pub fn append_default_exclude(mut self, val: bool) -> Self {
        self.task.append_default_exclude = val;
        self
    }

    pub fn output(mut self, path: &str) -> Self {
        self.task.outputs.push(path.to_string());
        self
    }

    pub fn discovered_inputs(mut self, path: &str) -> Self {
        self.task.discovered_inputs = Some(path.to_string());
        self
    }

    pub fn property(mut self, name: &str, value: impl Into<toml::Value>) -> Self {
        self.task.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
