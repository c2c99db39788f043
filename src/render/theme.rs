//! Style profiles and the per-construct style functions the markdown renderer applies.

use std::fmt;
use std::str::FromStr;

use crate::error::RenderError;
use crate::render::highlight::CodeHighlighter;

pub type StyleFn = Box<dyn Fn(&str) -> String>;

pub type CodeHighlighterFn = Box<dyn Fn(&str, Option<&str>) -> Vec<String>>;

/// Named style profile selected at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StyleProfile {
    #[default]
    Dark,
    Light,
    /// No escape sequences at all.
    Plain,
}

impl StyleProfile {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
            Self::Plain => "plain",
        }
    }

    fn syntax_theme(&self) -> Option<&'static str> {
        match self {
            Self::Dark => Some("base16-ocean.dark"),
            Self::Light => Some("InspiredGitHub"),
            Self::Plain => None,
        }
    }
}

impl fmt::Display for StyleProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStyleProfile(pub String);

impl fmt::Display for UnknownStyleProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown style profile '{}' (expected dark, light or plain)", self.0)
    }
}

impl std::error::Error for UnknownStyleProfile {}

impl FromStr for StyleProfile {
    type Err = UnknownStyleProfile;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            "plain" | "notty" => Ok(Self::Plain),
            other => Err(UnknownStyleProfile(other.to_string())),
        }
    }
}

pub struct MarkdownTheme {
    pub heading: StyleFn,
    pub link: StyleFn,
    pub link_url: StyleFn,
    pub code: StyleFn,
    pub code_block: StyleFn,
    pub code_block_border: StyleFn,
    pub quote: StyleFn,
    pub quote_border: StyleFn,
    pub hr: StyleFn,
    pub list_bullet: StyleFn,
    pub bold: StyleFn,
    pub italic: StyleFn,
    pub strikethrough: StyleFn,
    pub underline: StyleFn,
    pub highlight_code: Option<CodeHighlighterFn>,
    pub code_block_indent: String,
}

fn sgr(open: &'static str, close: &'static str) -> StyleFn {
    Box::new(move |text| format!("\x1b[{open}m{text}\x1b[{close}m"))
}

fn identity() -> StyleFn {
    Box::new(|text| text.to_string())
}

impl MarkdownTheme {
    /// Theme for `profile`; fails when its highlighting theme is not bundled.
    pub fn for_profile(profile: StyleProfile) -> Result<Self, RenderError> {
        let mut theme = match profile {
            StyleProfile::Plain => return Ok(Self::plain()),
            StyleProfile::Dark => Self::ansi("36", "33", "32"),
            StyleProfile::Light => Self::ansi("34", "35", "32"),
        };
        if let Some(name) = profile.syntax_theme() {
            let highlighter = CodeHighlighter::new(name)?;
            theme.highlight_code = Some(Box::new(move |code, lang| {
                highlighter.highlight(code, lang)
            }));
        }
        Ok(theme)
    }

    /// Every style is the identity function.
    pub fn plain() -> Self {
        Self {
            heading: identity(),
            link: identity(),
            link_url: identity(),
            code: identity(),
            code_block: identity(),
            code_block_border: identity(),
            quote: identity(),
            quote_border: identity(),
            hr: identity(),
            list_bullet: identity(),
            bold: identity(),
            italic: identity(),
            strikethrough: identity(),
            underline: identity(),
            highlight_code: None,
            code_block_indent: "  ".to_string(),
        }
    }

    fn ansi(accent: &'static str, code: &'static str, code_block: &'static str) -> Self {
        Self {
            heading: sgr(accent, "39"),
            link: sgr("34", "39"),
            link_url: sgr("2", "22"),
            code: sgr(code, "39"),
            code_block: sgr(code_block, "39"),
            code_block_border: sgr("2", "22"),
            quote: sgr("2", "22"),
            quote_border: sgr("2", "22"),
            hr: sgr("2", "22"),
            list_bullet: sgr(accent, "39"),
            bold: sgr("1", "22"),
            italic: sgr("3", "23"),
            strikethrough: sgr("9", "29"),
            underline: sgr("4", "24"),
            highlight_code: None,
            code_block_indent: "  ".to_string(),
        }
    }
}
