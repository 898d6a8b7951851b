// src/analysis/mod.rs

//! Up-to-date analysis.

pub mod analyzer;
pub mod verdict;

pub use analyzer::{analyze, CurrentExecution};
pub use verdict::{OutOfDateReason, Verdict};
