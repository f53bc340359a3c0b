//! Syntax Highlighting
//!
//! Whole-word keyword highlighting. A pass scans the full text once and
//! produces keyword spans; every byte not covered by a span is drawn in the
//! default style, so default spans are never materialized.

use std::collections::HashSet;
use std::ops::Range;
use tracing::warn;

/// Reserved words highlighted when no other set is supplied
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "func", "var", "let", "if", "else", "for", "while", "return", "import", "struct", "class",
    "enum", "protocol", "extension", "guard", "switch", "case", "break", "continue", "default",
    "in", "is", "as", "try", "catch", "throw", "throws", "nil",
];

/// Display style of a region of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Keyword,
    Default,
}

impl Style {
    pub fn name(&self) -> &'static str {
        match self {
            Style::Keyword => "keyword",
            Style::Default => "default",
        }
    }

    /// Foreground color as a hex string
    pub fn color(&self) -> &'static str {
        match self {
            Style::Keyword => "#FFA500",
            Style::Default => "#FFFFFF",
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, Style::Keyword)
    }
}

/// A styled region of the buffer, in byte offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub length: usize,
    pub style: Style,
}

impl Span {
    pub fn keyword(start: usize, length: usize) -> Self {
        Self {
            start,
            length,
            style: Style::Keyword,
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// The spans of one full highlight pass over a buffer revision
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HighlightResult {
    /// Buffer revision the pass was computed against
    pub revision: u64,
    /// Keyword spans, ordered by start and never overlapping
    pub spans: Vec<Span>,
}

impl HighlightResult {
    pub fn new(revision: u64, spans: Vec<Span>) -> Self {
        Self { revision, spans }
    }

    /// Run a full pass over `text`
    pub fn compute(text: &str, revision: u64, keywords: &KeywordSet) -> Self {
        Self::new(revision, tokenize(text, keywords))
    }

    pub fn keyword_count(&self) -> usize {
        self.spans.len()
    }

    /// Style of the byte at `offset`
    pub fn style_at(&self, offset: usize) -> Style {
        let idx = self.spans.partition_point(|span| span.end() <= offset);
        match self.spans.get(idx) {
            Some(span) if span.start <= offset => span.style,
            _ => Style::Default,
        }
    }

    /// Contiguous styled runs covering `0..text_len`, default gaps included
    pub fn runs(&self, text_len: usize) -> Vec<(Range<usize>, Style)> {
        let mut runs = Vec::with_capacity(self.spans.len() * 2 + 1);
        let mut pos = 0;

        for span in &self.spans {
            if span.start >= text_len {
                break;
            }
            if span.start > pos {
                runs.push((pos..span.start, Style::Default));
            }
            let end = span.end().min(text_len);
            runs.push((span.start..end, span.style));
            pos = end;
        }

        if pos < text_len {
            runs.push((pos..text_len, Style::Default));
        }
        runs
    }
}

/// Immutable set of reserved words, matched case-sensitively as whole words
#[derive(Debug, Clone)]
pub struct KeywordSet {
    words: HashSet<String>,
}

impl KeywordSet {
    /// Build a set, skipping entries that are not a single word
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words = words
            .into_iter()
            .map(Into::into)
            .filter(|word: &String| {
                let valid = !word.is_empty() && word.chars().all(is_word_char);
                if !valid {
                    warn!("Ignoring keyword {:?}: not a single word", word);
                }
                valid
            })
            .collect();

        Self { words }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().copied())
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Find every whole-word keyword occurrence in `text`, left to right.
///
/// Each maximal run of word characters is looked up once, so a keyword that
/// is only part of a longer identifier never matches.
pub fn tokenize(text: &str, keywords: &KeywordSet) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut word_start: Option<usize> = None;

    for (idx, c) in text.char_indices() {
        if is_word_char(c) {
            word_start.get_or_insert(idx);
        } else if let Some(start) = word_start.take() {
            if keywords.contains(&text[start..idx]) {
                spans.push(Span::keyword(start, idx - start));
            }
        }
    }

    if let Some(start) = word_start {
        if keywords.contains(&text[start..]) {
            spans.push(Span::keyword(start, text.len() - start));
        }
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str, spans: &[Span]) -> Vec<String> {
        spans.iter().map(|s| text[s.range()].to_string()).collect()
    }

    #[test]
    fn test_if_else_scenario() {
        let keywords = KeywordSet::new(["if", "else"]);
        let text = "if x { } else { }";
        let spans = tokenize(text, &keywords);

        assert_eq!(spans, vec![Span::keyword(0, 2), Span::keyword(9, 4)]);
    }

    #[test]
    fn test_keyword_inside_identifier_is_ignored() {
        let keywords = KeywordSet::new(["if"]);
        assert!(tokenize("iffy", &keywords).is_empty());
        assert!(tokenize("elif", &keywords).is_empty());
        assert!(tokenize("if_x _if if2", &keywords).is_empty());
    }

    #[test]
    fn test_punctuation_is_a_boundary() {
        let keywords = KeywordSet::new(["if", "in"]);
        let text = "(if)x.in;if";
        let spans = tokenize(text, &keywords);
        assert_eq!(words(text, &spans), vec!["if", "in", "if"]);
        assert_eq!(spans.last().unwrap().end(), text.len());
    }

    #[test]
    fn test_case_sensitive() {
        let keywords = KeywordSet::new(["let"]);
        assert!(tokenize("Let LET", &keywords).is_empty());
    }

    #[test]
    fn test_byte_offsets_after_multibyte() {
        let keywords = KeywordSet::new(["if"]);
        let text = "ąif żółw if";
        let spans = tokenize(text, &keywords);
        assert_eq!(spans.len(), 1);
        assert_eq!(&text[spans[0].range()], "if");
        assert_eq!(spans[0].start, text.len() - 2);
    }

    #[test]
    fn test_deterministic() {
        let keywords = KeywordSet::default();
        let text = "func main() {\n    let x = 1\n    if x > 0 { return } else { print(x) }\n}";
        let first = tokenize(text, &keywords);
        let second = tokenize(text, &keywords);
        assert_eq!(first, second);
        assert_eq!(words(text, &first), vec!["func", "let", "if", "return", "else"]);
    }

    #[test]
    fn test_invalid_keywords_are_skipped() {
        let keywords = KeywordSet::new(["else if", "", "guard"]);
        assert_eq!(keywords.len(), 1);
        assert!(keywords.contains("guard"));
    }

    #[test]
    fn test_default_set() {
        let keywords = KeywordSet::default();
        assert_eq!(keywords.len(), DEFAULT_KEYWORDS.len());
        assert!(keywords.contains("throws"));
        assert!(!keywords.contains("print"));
    }

    #[test]
    fn test_runs_cover_text() {
        let keywords = KeywordSet::new(["if"]);
        let text = "x if y";
        let result = HighlightResult::compute(text, 7, &keywords);

        assert_eq!(result.revision, 7);
        assert_eq!(
            result.runs(text.len()),
            vec![
                (0..2, Style::Default),
                (2..4, Style::Keyword),
                (4..6, Style::Default),
            ]
        );
        assert_eq!(result.style_at(2), Style::Keyword);
        assert_eq!(result.style_at(4), Style::Default);
        assert_eq!(HighlightResult::default().runs(0), vec![]);
    }
}
