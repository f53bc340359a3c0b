//! Text Buffer
//!
//! The authoritative script text, its revision counter, and the last
//! highlight pass applied to it.

use ropey::Rope;
use tracing::debug;

use crate::syntax::HighlightResult;

/// Script text owned by the editor shell
///
/// Every mutation bumps the revision. Highlight results carry the revision
/// they were computed for and are only accepted while it is still current.
#[derive(Debug, Default)]
pub struct TextBuffer {
    /// The rope containing the text
    rope: Rope,
    /// Incremented on every mutation
    revision: u64,
    /// Last applied highlight pass
    highlights: Option<HighlightResult>,
}

impl TextBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer from a string
    pub fn from_str(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            ..Self::default()
        }
    }

    /// Replace the text, returning the new revision.
    ///
    /// The revision advances even when the text is unchanged.
    pub fn mutate(&mut self, new_text: &str) -> u64 {
        if self.rope != new_text {
            self.rope = Rope::from_str(new_text);
        }
        self.revision += 1;
        self.revision
    }

    /// Snapshot of the text together with its revision
    pub fn current_text(&self) -> (String, u64) {
        (self.rope.to_string(), self.revision)
    }

    /// Get the full text content
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a highlight pass. Stale passes are dropped whole.
    pub fn apply_highlights(&mut self, result: HighlightResult) -> bool {
        if result.revision != self.revision {
            debug!(
                "Discarding stale highlights: buffer revision {} != result revision {}",
                self.revision, result.revision
            );
            return false;
        }
        self.highlights = Some(result);
        true
    }

    /// Last applied highlights; may lag behind the text while a pass is pending
    pub fn highlights(&self) -> Option<&HighlightResult> {
        self.highlights.as_ref()
    }

    /// Whether the applied highlights match the current text
    pub fn highlights_current(&self) -> bool {
        self.highlights
            .as_ref()
            .is_some_and(|h| h.revision == self.revision)
    }

    /// Get the number of lines
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Get the total character count
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Get the byte length
    pub fn byte_len(&self) -> usize {
        self.rope.len_bytes()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }
}
