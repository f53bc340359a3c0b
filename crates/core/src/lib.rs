//! Script Bench Core - configuration and shared types
//!
//! This crate provides what the editor, the runner, and the workbench shell
//! all agree on: configuration, the event bus, run status, and errors.

pub mod config;
pub mod events;
pub mod error;
pub mod status;

pub use config::{AppConfig, EditorConfig, OutputConfig, RunnerConfig};
pub use events::{Event, EventBus, EventSubscription};
pub use error::{WorkbenchError, Result};
pub use status::{new_session_id, RunStatus, SessionId};

/// Script Bench version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Script Bench";
