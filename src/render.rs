//! Terminal rendering of highlighted text

use script_bench_editor::{HighlightResult, Style};

const RESET: &str = "\x1b[0m";

/// ANSI escape that switches to `style`
fn ansi(style: Style) -> String {
    let mut codes = Vec::new();
    if style.is_bold() {
        codes.push("1".to_string());
    }
    if let Some((r, g, b)) = hex_rgb(style.color()) {
        codes.push(format!("38;2;{};{};{}", r, g, b));
    }
    format!("\x1b[{}m", codes.join(";"))
}

fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Render `text` with keyword runs colored. Default runs are left unstyled so
/// the terminal's own colors apply.
pub fn render_ansi(text: &str, highlights: Option<&HighlightResult>) -> String {
    let Some(highlights) = highlights else {
        return text.to_string();
    };

    let runs = highlights.runs(text.len());
    // Highlights may lag one edit behind the text
    if runs.iter().any(|(range, _)| text.get(range.clone()).is_none()) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + highlights.keyword_count() * 24);
    for (range, style) in runs {
        let segment = &text[range];
        match style {
            Style::Default => out.push_str(segment),
            Style::Keyword => {
                out.push_str(&ansi(style));
                out.push_str(segment);
                out.push_str(RESET);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use script_bench_editor::KeywordSet;

    #[test]
    fn test_keywords_are_wrapped() {
        let text = "let x";
        let result = HighlightResult::compute(text, 1, &KeywordSet::default());
        assert_eq!(
            render_ansi(text, Some(&result)),
            "\x1b[1;38;2;255;165;0mlet\x1b[0m x"
        );
    }

    #[test]
    fn test_without_highlights() {
        assert_eq!(render_ansi("let x", None), "let x");
    }

    #[test]
    fn test_hex_rgb() {
        assert_eq!(hex_rgb("#FFA500"), Some((255, 165, 0)));
        assert_eq!(hex_rgb("FFA500"), None);
    }
}
