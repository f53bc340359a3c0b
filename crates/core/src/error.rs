//! Error types for Script Bench
//!
//! Centralized error handling using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Script Bench
#[derive(Error, Debug)]
pub enum WorkbenchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to launch interpreter `{interpreter}`: {reason}")]
    Spawn { interpreter: String, reason: String },

    #[error("Failed to write script to {path:?}: {reason}")]
    Persist { path: PathBuf, reason: String },

    #[error("A script is already running")]
    AlreadyRunning,

    #[error("No script is running")]
    NotRunning,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Script Bench operations
pub type Result<T> = std::result::Result<T, WorkbenchError>;

impl WorkbenchError {
    /// Check if this error is recoverable
    ///
    /// A rejected run leaves the workbench untouched, so the user can simply
    /// try again once the active script has finished.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WorkbenchError::AlreadyRunning
                | WorkbenchError::NotRunning
                | WorkbenchError::Spawn { .. }
                | WorkbenchError::Persist { .. }
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            WorkbenchError::Io(e) => format!("File operation failed: {}", e),
            WorkbenchError::Config(msg) => format!("Configuration error: {}", msg),
            WorkbenchError::Spawn { interpreter, reason } => {
                format!("Error running script: could not start `{}` ({})", interpreter, reason)
            }
            WorkbenchError::Persist { path, reason } => {
                format!("Error saving script to {}: {}", path.display(), reason)
            }
            WorkbenchError::AlreadyRunning => "A script is already running".to_string(),
            WorkbenchError::NotRunning => "Nothing to cancel".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let err = WorkbenchError::Spawn {
            interpreter: "swift".into(),
            reason: "not found".into(),
        };
        assert_eq!(
            err.user_message(),
            "Error running script: could not start `swift` (not found)"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_internal_is_fatal() {
        let err = WorkbenchError::Internal("boom".into());
        assert!(!err.is_recoverable());
        assert_eq!(err.user_message(), "Internal error: boom");
    }
}
