// src/execution/build.rs

//! Sequential build loop: evaluate each task, run what is out of date,
//! record the result.

use std::fmt;

use tracing::{error, info, warn};

use crate::analysis::Verdict;
use crate::errors::TaskstateError;
use crate::execution::context::{ExecutionContext, TaskDeclaration};
use crate::execution::runner::{TaskOutcome, TaskRunner};
use crate::types::TaskIdentity;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Run every selected task regardless of the verdict.
    pub force: bool,
    /// Only evaluate; never run a task or touch history.
    pub status_only: bool,
}

/// What happened to a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    UpToDate,
    Executed,
    /// `status_only` build and the task would have run.
    WouldExecute,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: TaskIdentity,
    /// `None` when the task could not be evaluated at all.
    pub verdict: Option<Verdict>,
    pub result: TaskResult,
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.result, &self.verdict) {
            (TaskResult::UpToDate, _) => write!(f, "{}: up to date", self.task),
            (TaskResult::Executed, Some(v)) => write!(f, "{}: executed ({})", self.task, v),
            (TaskResult::Executed, None) => write!(f, "{}: executed", self.task),
            (TaskResult::WouldExecute, Some(v)) => write!(f, "{}: {}", self.task, v),
            (TaskResult::WouldExecute, None) => write!(f, "{}: would execute", self.task),
            (TaskResult::Failed(msg), _) => write!(f, "{}: FAILED: {}", self.task, msg),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub reports: Vec<TaskReport>,
}

impl BuildSummary {
    fn tasks_with(&self, pred: impl Fn(&TaskResult) -> bool) -> Vec<&TaskIdentity> {
        self.reports
            .iter()
            .filter(|r| pred(&r.result))
            .map(|r| &r.task)
            .collect()
    }

    pub fn executed(&self) -> Vec<&TaskIdentity> {
        self.tasks_with(|r| *r == TaskResult::Executed)
    }

    pub fn up_to_date(&self) -> Vec<&TaskIdentity> {
        self.tasks_with(|r| *r == TaskResult::UpToDate)
    }

    pub fn failed(&self) -> Vec<&TaskIdentity> {
        self.tasks_with(|r| matches!(r, TaskResult::Failed(_)))
    }

    pub fn is_success(&self) -> bool {
        self.failed().is_empty()
    }

    pub fn report(&self, task: &str) -> Option<&TaskReport> {
        self.reports.iter().find(|r| r.task.as_str() == task)
    }
}

/// Run `tasks` in order.
///
/// A failure of one task never stops the others: tasks are independent
/// here, and every failure ends up in the returned summary.
pub async fn execute(
    tasks: &[TaskDeclaration],
    ctx: &ExecutionContext,
    runner: &mut dyn TaskRunner,
    options: BuildOptions,
) -> BuildSummary {
    let mut summary = BuildSummary::default();

    for decl in tasks {
        let report = execute_one(decl, ctx, runner, options).await;
        if let TaskResult::Failed(msg) = &report.result {
            error!(task = %decl.identity, error = %msg, "task failed");
        }
        summary.reports.push(report);
    }

    info!(
        executed = summary.executed().len(),
        up_to_date = summary.up_to_date().len(),
        failed = summary.failed().len(),
        "build finished"
    );
    summary
}

async fn execute_one(
    decl: &TaskDeclaration,
    ctx: &ExecutionContext,
    runner: &mut dyn TaskRunner,
    options: BuildOptions,
) -> TaskReport {
    let failed = |verdict: Option<Verdict>, msg: String| TaskReport {
        task: decl.identity.clone(),
        verdict,
        result: TaskResult::Failed(msg),
    };

    let evaluation = match ctx.evaluate(decl) {
        Ok(e) => e,
        Err(e) => return failed(None, error_chain(&e)),
    };
    let verdict = evaluation.verdict.clone();

    if options.status_only {
        let result = if verdict.must_execute() {
            TaskResult::WouldExecute
        } else {
            TaskResult::UpToDate
        };
        return TaskReport {
            task: decl.identity.clone(),
            verdict: Some(verdict),
            result,
        };
    }

    if !verdict.must_execute() && !options.force {
        if let Err(e) = ctx.complete_up_to_date(decl, &evaluation.current) {
            warn!(task = %decl.identity, error = %error_chain(&e), "failed to refresh history");
        }
        return TaskReport {
            task: decl.identity.clone(),
            verdict: Some(verdict),
            result: TaskResult::UpToDate,
        };
    }

    let outcome = match runner.run(decl, ctx.root()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            discard(ctx, &decl.identity);
            return failed(Some(verdict), format!("{:#}", e));
        }
    };

    if let TaskOutcome::Failed(code) = outcome {
        discard(ctx, &decl.identity);
        let err = TaskstateError::TaskFailed {
            task: decl.identity.clone(),
            code,
        };
        return failed(Some(verdict), err.to_string());
    }

    match ctx.complete_execution(decl, &evaluation.current) {
        Ok(_) => TaskReport {
            task: decl.identity.clone(),
            verdict: Some(verdict),
            result: TaskResult::Executed,
        },
        // A failed write leaves the previous record in place.
        Err(e) => failed(Some(verdict), error_chain(&e)),
    }
}

fn discard(ctx: &ExecutionContext, task: &TaskIdentity) {
    if let Err(e) = ctx.discard_history(task) {
        warn!(task = %task, error = %error_chain(&e), "failed to discard history");
    }
}

/// Render an error and its sources on one line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        let msg = s.to_string();
        if !out.contains(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        source = s.source();
    }
    out
}
