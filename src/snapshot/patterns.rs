// src/snapshot/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::snapshot::paths::relative_key;

/// Default input configuration from `[default]` in the config.
///
/// ```toml
/// [default]
/// inputs = ["src/**/*.java"]
/// exclude = ["src/**/generated/**"]
/// ```
#[derive(Debug, Clone, Default)]
pub struct InputDefaults {
    pub inputs: Vec<String>,
    pub exclude: Vec<String>,
}

/// Raw per-task pattern specification coming from the config.
///
/// - `inputs` / `exclude` are optional task-local lists.
/// - `append_default_inputs` / `append_default_exclude` control whether the
///   task lists are merged with the default lists.
#[derive(Debug, Clone, Default)]
pub struct RawInputSpec {
    pub inputs: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub append_default_inputs: bool,
    pub append_default_exclude: bool,
}

/// Compiled include/exclude glob patterns for one task's declared inputs.
///
/// Patterns are relative to the project root and are matched against
/// normalized relative paths such as `"src/main/App.java"`.
#[derive(Clone)]
pub struct InputPatterns {
    include: Vec<String>,
    include_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for InputPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputPatterns")
            .field("include", &self.include)
            .finish_non_exhaustive()
    }
}

impl InputPatterns {
    /// Compile patterns for a task, applying the `[default]` merge rules:
    ///
    /// - If `append_default_inputs = true`, the effective list is
    ///   `task.inputs + default.inputs`.
    /// - Else, if `task.inputs` is set, use only that.
    /// - Else, use `default.inputs`.
    ///
    /// Same rules for `exclude`. Returns `None` when the effective include
    /// list is empty: the task declares no file inputs.
    pub fn compile(defaults: &InputDefaults, spec: &RawInputSpec) -> Result<Option<Self>> {
        let include = effective_patterns(
            spec.inputs.as_ref(),
            &defaults.inputs,
            spec.append_default_inputs,
        );
        if include.is_empty() {
            return Ok(None);
        }

        let exclude = effective_patterns(
            spec.exclude.as_ref(),
            &defaults.exclude,
            spec.append_default_exclude,
        );

        let include_set = build_globset(&include).context("building input globset")?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(&exclude).context("building exclude globset")?)
        };

        Ok(Some(Self {
            include,
            include_set,
            exclude_set,
        }))
    }

    /// Returns true if the given normalized relative path is a declared input.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    /// Collect all files under `root` that match these patterns, as sorted
    /// normalized relative keys.
    ///
    /// `skip` names directories (relative keys) that are never descended
    /// into, such as the history directory.
    pub fn collect_matching_files(
        &self,
        fs: &dyn FileSystem,
        root: &Path,
        skip: &[String],
    ) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let mut stack = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                let Some(rel) = relative_key(root, &path) else {
                    continue;
                };
                if fs.is_dir(&path) {
                    if !skip.iter().any(|s| rel == *s || rel.starts_with(&format!("{s}/"))) {
                        stack.push(path);
                    }
                } else if fs.is_file(&path) && self.matches(&rel) {
                    files.push(rel);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Helper to decide the effective patterns list for a given dimension
/// (inputs or exclude).
fn effective_patterns(
    task_list: Option<&Vec<String>>,
    default_list: &[String],
    append_default: bool,
) -> Vec<String> {
    match (task_list, append_default) {
        (Some(list), true) => {
            let mut combined = list.clone();
            combined.extend(default_list.iter().cloned());
            combined
        }
        (Some(list), false) => list.clone(),
        (None, _) => default_list.to_vec(),
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
