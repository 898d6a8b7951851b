// src/analysis/verdict.rs

use std::fmt;

use crate::implementation::ImplementationIdentity;
use crate::snapshot::fileset::FileChange;

/// Result of comparing a task's current state against its history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Recorded outputs are still valid; execution can be skipped.
    UpToDate,
    /// Something relevant changed.
    OutOfDate(OutOfDateReason),
    /// No usable history exists for the task.
    NoHistory,
}

impl Verdict {
    pub fn must_execute(&self) -> bool {
        !matches!(self, Verdict::UpToDate)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::UpToDate => f.write_str("up to date"),
            Verdict::OutOfDate(reason) => write!(f, "out of date: {reason}"),
            Verdict::NoHistory => f.write_str("no history is available"),
        }
    }
}

/// Why a task must run again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutOfDateReason {
    ImplementationChanged {
        previous: ImplementationIdentity,
        current: ImplementationIdentity,
    },
    OutputFilesAdded {
        paths: Vec<String>,
    },
    OutputFilesRemoved {
        paths: Vec<String>,
    },
    OutputsModifiedExternally {
        changes: Vec<FileChange>,
    },
    InputPropertyChanged {
        names: Vec<String>,
    },
    InputFilesChanged {
        changes: Vec<FileChange>,
    },
    DiscoveredInputFilesChanged {
        changes: Vec<FileChange>,
    },
}

/// At most this many items are listed in a rendered reason.
const MAX_LISTED: usize = 3;

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().take(MAX_LISTED).enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    if items.len() > MAX_LISTED {
        write!(f, " and {} more", items.len() - MAX_LISTED)?;
    }
    Ok(())
}

impl fmt::Display for OutOfDateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutOfDateReason::ImplementationChanged { previous, current } => {
                if previous.task_type() != current.task_type() {
                    write!(
                        f,
                        "task type changed from {} to {}",
                        previous.task_type(),
                        current.task_type()
                    )
                } else {
                    write!(f, "implementation of {} changed", current.task_type())
                }
            }
            OutOfDateReason::OutputFilesAdded { paths } => {
                f.write_str("output files were added: ")?;
                write_list(f, paths)
            }
            OutOfDateReason::OutputFilesRemoved { paths } => {
                f.write_str("output files were removed: ")?;
                write_list(f, paths)
            }
            OutOfDateReason::OutputsModifiedExternally { changes } => {
                f.write_str("outputs changed since the last execution: ")?;
                write_list(f, changes)
            }
            OutOfDateReason::InputPropertyChanged { names } => {
                f.write_str("input properties changed: ")?;
                write_list(f, names)
            }
            OutOfDateReason::InputFilesChanged { changes } => {
                f.write_str("input files changed: ")?;
                write_list(f, changes)
            }
            OutOfDateReason::DiscoveredInputFilesChanged { changes } => {
                f.write_str("discovered input files changed: ")?;
                write_list(f, changes)
            }
        }
    }
}
