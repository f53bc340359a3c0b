//! Script Bench - interactive script workbench
//!
//! Edit a script, watch its keywords light up as you type, run it, and read
//! its output as it is produced.
//!
//! ## Architecture
//!
//! Script Bench is organized into specialized crates:
//!
//! - `script-bench-core`: configuration, events, run status, errors
//! - `script-bench-editor`: text buffer, keyword tokenizer, debounced highlighting
//! - `script-bench-runner`: script persistence and the process pipeline
//!
//! This crate ties them together in a [`Workbench`] session and provides the
//! command line shell.

#![warn(clippy::all)]

pub mod commands;
pub mod render;
pub mod shell;
pub mod workbench;

pub use workbench::Workbench;

// Re-export main components for library usage
pub use script_bench_core as core;
pub use script_bench_editor as editor;
pub use script_bench_runner as runner;

/// Prelude module for convenient imports
pub mod prelude {
    pub use script_bench_core::{AppConfig, Event, RunStatus, WorkbenchError};
    pub use script_bench_editor::{HighlightScheduler, KeywordSet, TextBuffer};
    pub use script_bench_runner::{ProcessRunner, RunRequest, RunSession};
    pub use crate::workbench::Workbench;
}
