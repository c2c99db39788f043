//! Fenced-code syntax highlighting backed by syntect's bundled syntaxes and themes.

use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

use crate::error::RenderError;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

const RESET: &str = "\x1b[0m";

/// Loads the bundled syntax and theme sets ahead of the first code block.
pub fn prewarm() {
    Lazy::force(&SYNTAX_SET);
    Lazy::force(&THEME_SET);
}

#[derive(Clone, Copy)]
pub struct CodeHighlighter {
    theme: &'static Theme,
}

impl CodeHighlighter {
    pub fn new(theme_name: &str) -> Result<Self, RenderError> {
        THEME_SET
            .themes
            .get(theme_name)
            .map(|theme| Self { theme })
            .ok_or_else(|| RenderError::UnknownTheme(theme_name.to_string()))
    }

    /// One styled row per source line; unknown languages fall back to plain text.
    pub fn highlight(&self, code: &str, lang: Option<&str>) -> Vec<String> {
        let syntax = lang
            .and_then(|token| SYNTAX_SET.find_syntax_by_token(token))
            .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
        let mut highlighter = HighlightLines::new(syntax, self.theme);

        let mut rows = Vec::new();
        for line in LinesWithEndings::from(code) {
            let bare = line.trim_end_matches(['\n', '\r']);
            match highlighter.highlight_line(line, &SYNTAX_SET) {
                Ok(ranges) => {
                    let escaped = as_24_bit_terminal_escaped(&ranges, false);
                    let mut row = escaped.trim_end_matches(['\n', '\r']).to_string();
                    row.push_str(RESET);
                    rows.push(row);
                }
                Err(_) => rows.push(bare.to_string()),
            }
        }
        if rows.is_empty() || code.ends_with('\n') {
            rows.push(String::new());
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::CodeHighlighter;
    use crate::core::text::width::visible_width;
    use crate::error::RenderError;

    #[test]
    fn unknown_theme_is_rejected() {
        assert!(matches!(
            CodeHighlighter::new("no-such-theme"),
            Err(RenderError::UnknownTheme(name)) if name == "no-such-theme"
        ));
    }

    #[test]
    fn highlighting_keeps_one_row_per_line() {
        let highlighter = CodeHighlighter::new("base16-ocean.dark").expect("bundled theme");
        let rows = highlighter.highlight("fn main() {\n    println!(\"hi\");\n}", Some("rust"));
        assert_eq!(rows.len(), 3);
        assert!(rows[0].contains("\x1b[38;2;"));
        assert_eq!(visible_width(&rows[1]), "    println!(\"hi\");".len());
    }

    #[test]
    fn empty_code_yields_one_empty_row() {
        let highlighter = CodeHighlighter::new("InspiredGitHub").expect("bundled theme");
        assert_eq!(highlighter.highlight("", None), vec![String::new()]);
    }
}
