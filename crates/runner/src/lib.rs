//! Script Runner
//!
//! Persists the buffer to a script file, launches the interpreter on it, and
//! streams the combined output back to a single subscriber.

pub mod store;
pub mod output;
pub mod session;
pub mod runner;

pub use store::ScriptStore;
pub use session::{RunEvent, RunSession, RunSubscriber, Transcript};
pub use runner::{ProcessRunner, RunRequest};

use std::path::PathBuf;
use script_bench_core::WorkbenchError;

/// Errors that stop a run before it starts
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Failed to launch interpreter `{interpreter}`: {reason}")]
    Spawn { interpreter: String, reason: String },
    #[error("Failed to write script to {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("A script is already running")]
    AlreadyRunning,
}

impl From<RunError> for WorkbenchError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Spawn { interpreter, reason } => WorkbenchError::Spawn { interpreter, reason },
            RunError::Persist { path, source } => WorkbenchError::Persist {
                path,
                reason: source.to_string(),
            },
            RunError::AlreadyRunning => WorkbenchError::AlreadyRunning,
        }
    }
}
