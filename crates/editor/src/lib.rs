//! Script Bench Editor
//!
//! The editing half of the workbench:
//! - Rope-based text buffer with a revision counter
//! - Whole-word keyword tokenizer
//! - Debounced highlight scheduling that never applies a stale pass

pub mod buffer;
pub mod syntax;
pub mod scheduler;

pub use buffer::TextBuffer;
pub use syntax::{tokenize, HighlightResult, KeywordSet, Span, Style, DEFAULT_KEYWORDS};
pub use scheduler::{HighlightMsg, HighlightOutcome, HighlightScheduler};
