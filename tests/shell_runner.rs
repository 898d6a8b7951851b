#![cfg(unix)]

mod common;

use std::error::Error;

use taskstate::execution::{declarations_from_config, ShellRunner, TaskOutcome, TaskRunner};
use taskstate_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use taskstate_test_utils::with_timeout;

use crate::common::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

async fn run_cmd(cmd: &str, root: &std::path::Path) -> Result<TaskOutcome, Box<dyn Error>> {
    let cfg = ConfigFileBuilder::new()
        .with_task("sh", TaskConfigBuilder::new(cmd).build())
        .build();
    let task = declarations_from_config(&cfg)?.remove(0);
    let mut runner = ShellRunner;
    Ok(with_timeout(runner.run(&task, root)).await?)
}

#[tokio::test]
async fn non_utf8_output_does_not_break_the_task() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    // Enough output after the bad line to fill a pipe that nobody reads.
    let cmd = "printf 'ok\\n\\377\\376\\n'; i=0; while [ $i -lt 5000 ]; do \
               echo 'some more output to keep the pipe busy'; i=$((i+1)); done; \
               touch done.marker";
    let outcome = run_cmd(cmd, dir.path()).await?;

    assert_eq!(outcome, TaskOutcome::Success);
    assert!(dir.path().join("done.marker").exists());
    Ok(())
}

#[tokio::test]
async fn exit_code_is_reported() -> TestResult {
    let dir = tempfile::tempdir()?;
    let outcome = run_cmd("exit 3", dir.path()).await?;
    assert_eq!(outcome, TaskOutcome::Failed(3));
    Ok(())
}
