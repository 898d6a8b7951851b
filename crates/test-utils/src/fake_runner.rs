use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use taskstate::execution::{TaskDeclaration, TaskOutcome, TaskRunner};
use taskstate::fs::mock::MockFileSystem;

#[derive(Debug, Clone)]
enum Behaviour {
    Outcome(TaskOutcome),
    SpawnError(String),
}

/// A `TaskRunner` that never spawns processes.
///
/// - Records the name of every task it is asked to run.
/// - Optionally "produces" files on a shared `MockFileSystem`, relative to
///   the project root, as a real command would.
/// - Succeeds unless told otherwise per task.
#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    fs: Option<MockFileSystem>,
    writes: HashMap<String, Vec<(String, Vec<u8>)>>,
    behaviour: HashMap<String, Behaviour>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fs(fs: MockFileSystem) -> Self {
        Self {
            fs: Some(fs),
            ..Self::default()
        }
    }

    /// When `task` runs, write `content` to root-relative `path`.
    pub fn writes(mut self, task: &str, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.writes
            .entry(task.to_string())
            .or_default()
            .push((path.to_string(), content.into()));
        self
    }

    pub fn fails(mut self, task: &str, code: i32) -> Self {
        self.behaviour
            .insert(task.to_string(), Behaviour::Outcome(TaskOutcome::Failed(code)));
        self
    }

    pub fn spawn_error(mut self, task: &str, message: &str) -> Self {
        self.behaviour
            .insert(task.to_string(), Behaviour::SpawnError(message.to_string()));
        self
    }

    /// Change the outcome of `task` after construction.
    pub fn set_outcome(&mut self, task: &str, outcome: TaskOutcome) {
        self.behaviour
            .insert(task.to_string(), Behaviour::Outcome(outcome));
    }

    /// Task names in the order they were run.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Return and forget the executed tasks.
    pub fn take_executed(&self) -> Vec<String> {
        std::mem::take(&mut *self.executed.lock().unwrap())
    }
}

impl TaskRunner for FakeRunner {
    fn run<'a>(
        &'a mut self,
        task: &'a TaskDeclaration,
        root: &'a Path,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<TaskOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let name = task.identity.as_str().to_string();
            self.executed.lock().unwrap().push(name.clone());

            if let Some(Behaviour::SpawnError(msg)) = self.behaviour.get(&name) {
                return Err(anyhow::anyhow!("{}", msg));
            }

            if let (Some(fs), Some(files)) = (&self.fs, self.writes.get(&name)) {
                for (path, content) in files {
                    fs.add_file(root.join(path), content.clone());
                }
            }

            Ok(match self.behaviour.get(&name) {
                Some(Behaviour::Outcome(outcome)) => *outcome,
                _ => TaskOutcome::Success,
            })
        })
    }
}
