mod common;

use std::error::Error;
use std::fs;
use std::sync::Arc;

use taskstate::analysis::{OutOfDateReason, Verdict};
use taskstate::errors::TaskstateError;
use taskstate::execution::context::parse_discovered_inputs;
use taskstate::execution::{declarations_from_config, ExecutionContext, TaskDeclaration};
use taskstate::fs::{FileSystem, RealFileSystem};
use taskstate::history::HistoryStore;
use taskstate::snapshot::{FileFingerprint, FileSnapshotter};
use taskstate_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};

use crate::common::{init_tracing, mock_context, mock_project, HISTORY_DIR};

type TestResult = Result<(), Box<dyn Error>>;

fn compile_task() -> TaskDeclaration {
    let cfg = ConfigFileBuilder::new()
        .with_task(
            "compile",
            TaskConfigBuilder::new("cc -o build/app src/main.c")
                .input("src/**/*.c")
                .output("build/app")
                .discovered_inputs("build/app.inputs")
                .property("optimize", "O2")
                .build(),
        )
        .build();
    declarations_from_config(&cfg)
        .expect("declarations")
        .remove(0)
}

#[test]
fn first_evaluation_has_no_history() -> TestResult {
    init_tracing();
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    let ctx = mock_context(&fs, &root);

    let eval = ctx.evaluate(&compile_task())?;
    assert_eq!(eval.verdict, Verdict::NoHistory);

    let inputs = eval.current.input_files.as_ref().expect("declared inputs");
    assert_eq!(inputs.paths().collect::<Vec<_>>(), vec!["src/main.c"]);
    // Output does not exist yet.
    let outputs = eval.current.output_files_snapshot.as_ref().expect("declared outputs");
    assert_eq!(outputs.get("build/app"), Some(&FileFingerprint::Missing));
    Ok(())
}

#[test]
fn completed_execution_makes_the_task_up_to_date() -> TestResult {
    init_tracing();
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    fs.add_file(root.join("include/util.h"), "#pragma once");
    let ctx = mock_context(&fs, &root);
    let task = compile_task();

    let eval = ctx.evaluate(&task)?;
    // The "task body".
    fs.add_file(root.join("build/app"), "ELF");
    fs.add_file(root.join("build/app.inputs"), "# deps\ninclude/util.h\n\n./src/main.c\n");
    let record = ctx.complete_execution(&task, &eval.current)?;

    assert_eq!(
        record.discovered_input_paths(),
        vec!["include/util.h".to_string(), "src/main.c".to_string()]
    );
    assert!(matches!(
        record.output_files_snapshot().and_then(|s| s.get("build/app")),
        Some(FileFingerprint::File { .. })
    ));

    assert_eq!(ctx.evaluate(&task)?.verdict, Verdict::UpToDate);
    Ok(())
}

#[test]
fn history_files_never_count_as_inputs() -> TestResult {
    let (fs, root) = mock_project();
    fs.add_file(root.join("notes.txt"), "hello");
    let ctx = mock_context(&fs, &root);

    let cfg = ConfigFileBuilder::new()
        .with_task("all", TaskConfigBuilder::new("true").input("**").build())
        .build();
    let task = declarations_from_config(&cfg)?.remove(0);

    let eval = ctx.evaluate(&task)?;
    ctx.complete_execution(&task, &eval.current)?;
    assert!(fs.file_paths().iter().any(|p| p.starts_with(root.join(HISTORY_DIR))));

    // Writing the record must not make the task out of date.
    assert_eq!(ctx.evaluate(&task)?.verdict, Verdict::UpToDate);
    Ok(())
}

#[test]
fn changed_discovered_input_makes_the_task_out_of_date() -> TestResult {
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    fs.add_file(root.join("include/util.h"), "#pragma once");
    let ctx = mock_context(&fs, &root);
    let task = compile_task();

    let eval = ctx.evaluate(&task)?;
    fs.add_file(root.join("build/app"), "ELF");
    fs.add_file(root.join("build/app.inputs"), "include/util.h\n");
    ctx.complete_execution(&task, &eval.current)?;

    fs.add_file(root.join("include/util.h"), "#pragma once\n#define X 1");
    match ctx.evaluate(&task)?.verdict {
        Verdict::OutOfDate(OutOfDateReason::DiscoveredInputFilesChanged { changes }) => {
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].path, "include/util.h");
        }
        other => panic!("expected DiscoveredInputFilesChanged, got {other:?}"),
    }
    Ok(())
}

#[test]
fn discovered_input_outside_the_project_is_tracked() -> TestResult {
    init_tracing();
    let project = tempfile::tempdir()?;
    let system = tempfile::tempdir()?;
    let root = project.path();
    let header = system.path().join("util.h");
    fs::create_dir_all(root.join("src"))?;
    fs::create_dir_all(root.join("build"))?;
    fs::write(root.join("src/main.c"), "int main() {}")?;
    fs::write(&header, "#pragma once")?;

    let real: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let store = HistoryStore::on_disk(Arc::clone(&real), root.join(HISTORY_DIR));
    let ctx = ExecutionContext::new(store, FileSnapshotter::new(real, root)).skip_dir(HISTORY_DIR);
    let task = compile_task();

    let eval = ctx.evaluate(&task)?;
    fs::write(root.join("build/app"), "ELF")?;
    // Depfiles list absolute paths, both inside and outside the project.
    fs::write(
        root.join("build/app.inputs"),
        format!("{}
{}
", header.display(), root.join("src/main.c").display()),
    )?;
    let record = ctx.complete_execution(&task, &eval.current)?;

    let header_key = header.to_string_lossy().into_owned();
    let discovered = record.discovered_input_files().expect("discovered inputs");
    assert!(matches!(discovered.get(&header_key), Some(FileFingerprint::File { .. })));
    assert!(matches!(discovered.get("src/main.c"), Some(FileFingerprint::File { .. })));
    assert_eq!(ctx.evaluate(&task)?.verdict, Verdict::UpToDate);

    fs::write(&header, "#pragma once\n#define X 1")?;
    match ctx.evaluate(&task)?.verdict {
        Verdict::OutOfDate(OutOfDateReason::DiscoveredInputFilesChanged { changes }) => {
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].path, header_key);
        }
        other => panic!("expected DiscoveredInputFilesChanged, got {other:?}"),
    }
    Ok(())
}

#[test]
fn deleting_an_output_makes_the_task_out_of_date() -> TestResult {
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    let ctx = mock_context(&fs, &root);
    let task = compile_task();

    let eval = ctx.evaluate(&task)?;
    fs.add_file(root.join("build/app"), "ELF");
    ctx.complete_execution(&task, &eval.current)?;

    fs.remove(root.join("build/app"));
    assert!(matches!(
        ctx.evaluate(&task)?.verdict,
        Verdict::OutOfDate(OutOfDateReason::OutputsModifiedExternally { .. })
    ));
    Ok(())
}

#[test]
fn unreadable_input_is_an_error_not_a_change() -> TestResult {
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    fs.make_unreadable(root.join("src/main.c"));
    let ctx = mock_context(&fs, &root);

    match ctx.evaluate(&compile_task()) {
        Err(TaskstateError::Snapshot { path, .. }) => {
            assert_eq!(path, root.join("src/main.c"));
        }
        Err(other) => panic!("expected a snapshot error, got {other}"),
        Ok(eval) => panic!("expected a snapshot error, got verdict {}", eval.verdict),
    }
    Ok(())
}

#[test]
fn discarded_history_means_no_history() -> TestResult {
    let (fs, root) = mock_project();
    fs.add_file(root.join("src/main.c"), "int main() {}");
    let ctx = mock_context(&fs, &root);
    let task = compile_task();

    let eval = ctx.evaluate(&task)?;
    ctx.complete_execution(&task, &eval.current)?;
    ctx.discard_history(&task.identity)?;

    assert_eq!(ctx.evaluate(&task)?.verdict, Verdict::NoHistory);
    Ok(())
}

#[test]
fn discovered_inputs_file_format() {
    let parsed = parse_discovered_inputs("  a.h \n# comment\n\nsub\\b.h\n./c.h");
    assert_eq!(parsed, vec!["a.h", "sub/b.h", "c.h"]);

    let absolute = parse_discovered_inputs("/usr/include/stdio.h\n");
    assert_eq!(absolute, vec!["/usr/include/stdio.h"]);
}
