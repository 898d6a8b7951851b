// src/execution/runner.rs

//! Task process runner.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::execution::context::TaskDeclaration;

/// Outcome of running a task body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Exit code, or -1 if the process was killed by a signal.
    Failed(i32),
}

impl TaskOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Runs the body of a task.
///
/// The build loop calls this only for tasks the analyzer decided to
/// execute. An `Err` means the task could not be run at all (e.g. the
/// process failed to spawn); a task that ran and failed returns
/// `Ok(TaskOutcome::Failed(_))`.
pub trait TaskRunner: Send {
    fn run<'a>(
        &'a mut self,
        task: &'a TaskDeclaration,
        root: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<TaskOutcome>> + Send + 'a>>;
}

/// Runs task commands through the platform shell, in the project root.
///
/// stdout lines are logged at `info`, stderr lines at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl TaskRunner for ShellRunner {
    fn run<'a>(
        &'a mut self,
        task: &'a TaskDeclaration,
        root: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<TaskOutcome>> + Send + 'a>> {
        Box::pin(run_shell(task, root))
    }
}

async fn run_shell(task: &TaskDeclaration, root: &Path) -> Result<TaskOutcome> {
    info!(task = %task.identity, cmd = %task.cmd, "starting task process");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&task.cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&task.cmd);
        c
    };

    cmd.current_dir(root)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task.identity))?;

    let stdout_handle = child.stdout.take().map(|stdout| {
        let name = task.identity.clone();
        tokio::spawn(drain_lines(stdout, move |line| info!(task = %name, "{}", line)))
    });

    // Always consume stderr so the pipe buffer cannot fill up.
    let stderr_handle = child.stderr.take().map(|stderr| {
        let name = task.identity.clone();
        tokio::spawn(drain_lines(stderr, move |line| {
            debug!(task = %name, "stderr: {}", line)
        }))
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{}'", task.identity))?;

    // Drain remaining output before reporting, so logs stay in order.
    for handle in [stdout_handle, stderr_handle].into_iter().flatten() {
        let _ = handle.await;
    }

    let code = status.code().unwrap_or(-1);
    info!(
        task = %task.identity,
        exit_code = code,
        success = status.success(),
        "task process exited"
    );

    Ok(if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failed(code)
    })
}

/// Read `reader` to the end, handing each line to `emit`.
///
/// Lines that are not valid UTF-8 are decoded lossily; the pipe is drained
/// either way so the child never blocks on a full buffer.
async fn drain_lines<R>(reader: R, mut emit: impl FnMut(&str)) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                emit(line.trim_end_matches(['\r', '\n']));
                count += 1;
            }
        }
    }
    count
}
