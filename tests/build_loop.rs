mod common;

use taskstate::analysis::{OutOfDateReason, Verdict};
use taskstate::config::ConfigFile;
use taskstate::execution::{
    declarations_from_config, execute, BuildOptions, TaskOutcome, TaskResult,
};
use taskstate_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use taskstate_test_utils::fake_runner::FakeRunner;
use taskstate_test_utils::with_timeout;

use crate::common::{init_tracing, mock_context, mock_project};

/// Layout:
/// - [task.compile]  inputs src/**, output build/app
/// - [task.docs]     inputs docs/**, output site/index.html
fn two_task_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_task(
            "compile",
            TaskConfigBuilder::new("cc -o build/app src/main.c")
                .input("src/**")
                .output("build/app")
                .build(),
        )
        .with_task(
            "docs",
            TaskConfigBuilder::new("mdbook build")
                .input("docs/**")
                .output("site/index.html")
                .build(),
        )
        .build()
}

fn producing_runner(fs: &taskstate::fs::mock::MockFileSystem) -> FakeRunner {
    FakeRunner::with_fs(fs.clone())
        .writes("compile", "build/app", "ELF")
        .writes("docs", "site/index.html", "<html>")
}

#[tokio::test]
async fn second_build_skips_everything() {
    init_tracing();
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    fs.add_file(root.join("docs/intro.md"), "# Intro");
    let ctx = mock_context(&fs, &root);
    let tasks = declarations_from_config(&two_task_config()).unwrap();
    let mut runner = producing_runner(&fs);

    let first = with_timeout(execute(&tasks, &ctx, &mut runner, BuildOptions::default())).await;
    assert!(first.is_success());
    assert_eq!(runner.take_executed(), vec!["compile", "docs"]);
    assert_eq!(
        first.report("compile").and_then(|r| r.verdict.clone()),
        Some(Verdict::NoHistory)
    );

    let second = with_timeout(execute(&tasks, &ctx, &mut runner, BuildOptions::default())).await;
    assert!(runner.take_executed().is_empty());
    assert_eq!(second.up_to_date().len(), 2);
}

#[tokio::test]
async fn only_the_task_with_changed_inputs_runs() {
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    fs.add_file(root.join("docs/intro.md"), "# Intro");
    let ctx = mock_context(&fs, &root);
    let tasks = declarations_from_config(&two_task_config()).unwrap();
    let mut runner = producing_runner(&fs);

    execute(&tasks, &ctx, &mut runner, BuildOptions::default()).await;
    runner.take_executed();

    fs.add_file(root.join("docs/intro.md"), "# Introduction");
    let summary = execute(&tasks, &ctx, &mut runner, BuildOptions::default()).await;

    assert_eq!(runner.take_executed(), vec!["docs"]);
    let docs = summary.report("docs").unwrap();
    assert_eq!(docs.result, TaskResult::Executed);
    assert!(matches!(
        docs.verdict,
        Some(Verdict::OutOfDate(OutOfDateReason::InputFilesChanged { .. }))
    ));
}

#[tokio::test]
async fn failed_task_runs_again_next_time() {
    init_tracing();
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    fs.add_file(root.join("docs/intro.md"), "# Intro");
    let ctx = mock_context(&fs, &root);
    let tasks = declarations_from_config(&two_task_config()).unwrap();
    let mut runner = producing_runner(&fs);

    execute(&tasks, &ctx, &mut runner, BuildOptions::default()).await;
    runner.take_executed();

    // Change an input and let the rebuild fail halfway.
    fs.add_file(root.join("src/main.c"), "int main() { return 1; }");
    runner.set_outcome("compile", TaskOutcome::Failed(2));
    let failed = execute(&tasks, &ctx, &mut runner, BuildOptions::default()).await;
    assert!(!failed.is_success());
    assert_eq!(failed.failed().len(), 1);
    assert_eq!(failed.failed()[0].as_str(), "compile");
    // The other task is unaffected.
    assert_eq!(failed.up_to_date().len(), 1);

    // Even with the earlier inputs restored, the failed task is not trusted.
    fs.add_file(root.join("src/main.c"), "int main() {}");
    runner.set_outcome("compile", TaskOutcome::Success);
    runner.take_executed();
    let summary = execute(&tasks, &ctx, &mut runner, BuildOptions::default()).await;
    assert_eq!(runner.take_executed(), vec!["compile"]);
    assert_eq!(
        summary.report("compile").and_then(|r| r.verdict.clone()),
        Some(Verdict::NoHistory)
    );
}

#[tokio::test]
async fn spawn_error_is_reported_as_failure() {
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    let ctx = mock_context(&fs, &root);
    let tasks = declarations_from_config(&two_task_config()).unwrap();
    let mut runner = FakeRunner::with_fs(fs.clone()).spawn_error("compile", "sh: not found");

    let summary = execute(&tasks, &ctx, &mut runner, BuildOptions::default()).await;
    match &summary.report("compile").unwrap().result {
        TaskResult::Failed(msg) => assert!(msg.contains("sh: not found"), "got: {msg}"),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn status_only_never_runs_or_records() {
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    let ctx = mock_context(&fs, &root);
    let tasks = declarations_from_config(&two_task_config()).unwrap();
    let mut runner = producing_runner(&fs);
    let options = BuildOptions {
        status_only: true,
        ..BuildOptions::default()
    };

    let summary = execute(&tasks, &ctx, &mut runner, options).await;
    assert!(runner.executed().is_empty());
    assert!(summary
        .reports
        .iter()
        .all(|r| r.result == TaskResult::WouldExecute));
    assert!(ctx.history().tasks().unwrap().is_empty());
}

#[tokio::test]
async fn force_runs_up_to_date_tasks() {
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    fs.add_file(root.join("docs/intro.md"), "# Intro");
    let ctx = mock_context(&fs, &root);
    let tasks = declarations_from_config(&two_task_config()).unwrap();
    let mut runner = producing_runner(&fs);

    execute(&tasks, &ctx, &mut runner, BuildOptions::default()).await;
    runner.take_executed();

    let options = BuildOptions {
        force: true,
        ..BuildOptions::default()
    };
    let summary = execute(&tasks, &ctx, &mut runner, options).await;
    assert_eq!(runner.take_executed(), vec!["compile", "docs"]);
    assert_eq!(summary.executed().len(), 2);
    assert_eq!(
        summary.report("docs").and_then(|r| r.verdict.clone()),
        Some(Verdict::UpToDate)
    );
}

#[tokio::test]
async fn unreadable_input_fails_only_that_task() {
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    fs.add_file(root.join("docs/intro.md"), "# Intro");
    fs.make_unreadable(root.join("src/main.c"));
    let ctx = mock_context(&fs, &root);
    let tasks = declarations_from_config(&two_task_config()).unwrap();
    let mut runner = producing_runner(&fs);

    let summary = execute(&tasks, &ctx, &mut runner, BuildOptions::default()).await;
    assert_eq!(runner.executed(), vec!["docs"]);
    let compile = summary.report("compile").unwrap();
    assert!(compile.verdict.is_none());
    assert!(matches!(compile.result, TaskResult::Failed(_)));
}
