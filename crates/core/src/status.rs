//! Run status types shared by the runner and the workbench.

use std::fmt;
use serde::{Deserialize, Serialize};

/// Identifier of one script execution
pub type SessionId = uuid::Uuid;

/// Allocate a fresh session id
pub fn new_session_id() -> SessionId {
    uuid::Uuid::new_v4()
}

/// How a script execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunStatus {
    /// The process exited normally with a code
    Exited { code: i32 },
    /// The process ended without an exit code (killed by a signal, crashed)
    Terminated { signal: Option<i32> },
    /// The run was cancelled by the user
    Cancelled,
}

impl RunStatus {
    pub fn success(&self) -> bool {
        matches!(self, RunStatus::Exited { code: 0 })
    }

    /// Exit code if the process exited normally
    pub fn code(&self) -> Option<i32> {
        match self {
            RunStatus::Exited { code } => Some(*code),
            _ => None,
        }
    }

    /// Line appended to the output log when a run finishes
    pub fn summary(&self) -> String {
        match self {
            RunStatus::Exited { code } => format!("Exit code: {}", code),
            RunStatus::Terminated { signal: Some(sig) } => format!("Terminated by signal {}", sig),
            RunStatus::Terminated { signal: None } => "Terminated abnormally".to_string(),
            RunStatus::Cancelled => "Cancelled".to_string(),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        assert_eq!(RunStatus::Exited { code: 0 }.summary(), "Exit code: 0");
        assert_eq!(RunStatus::Terminated { signal: Some(9) }.to_string(), "Terminated by signal 9");
        assert_eq!(RunStatus::Cancelled.code(), None);
        assert!(!RunStatus::Exited { code: 2 }.success());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&RunStatus::Exited { code: 3 }).unwrap();
        assert_eq!(json, r#"{"kind":"exited","code":3}"#);
    }
}
