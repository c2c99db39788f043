//! Full-document rendering: the renderer seam plus the snapshot normalization steps applied to
//! every render.

pub mod highlight;
pub mod markdown;
pub mod theme;

use crate::error::RenderError;

pub use markdown::{MarkdownBackend, MarkdownRenderer};
pub use theme::{MarkdownTheme, StyleFn, StyleProfile};

/// Deterministic `markdown -> styled text` function for a fixed style and width.
pub trait DocumentRenderer {
    /// Render a complete document. The output is newline-separated rows.
    fn render(&mut self, markdown: &str) -> Result<String, RenderError>;
}

/// Builds renderers for a style profile fixed at construction.
pub trait RenderBackend {
    type Renderer: DocumentRenderer;

    /// `None` renders without wrapping ("flowing" output).
    fn build(&self, width: Option<usize>) -> Result<Self::Renderer, RenderError>;
}

/// Replaces tabs with two spaces so the renderer's own tab expansion cannot overflow the width.
pub fn normalize_tabs(markdown: &str) -> String {
    markdown.replace('\t', "  ")
}

/// Collapses every run of three or more newlines to exactly two.
pub fn collapse_blank_runs(rendered: &str) -> String {
    let mut out = String::with_capacity(rendered.len());
    let mut newlines = 0;
    for ch in rendered.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else {
            newlines = 0;
        }
        out.push(ch);
    }
    out
}

pub fn strip_trailing_newlines(rendered: &str) -> &str {
    rendered.trim_end_matches('\n')
}

/// Renders `markdown` and normalizes the result into a snapshot.
///
/// A `stable` snapshot drops trailing newlines, which are not authoritative while more content
/// may still arrive.
pub fn render_snapshot<R: DocumentRenderer + ?Sized>(
    renderer: &mut R,
    markdown: &str,
    stable: bool,
) -> Result<String, RenderError> {
    let rendered = renderer.render(&normalize_tabs(markdown))?;
    let collapsed = collapse_blank_runs(&rendered);
    if stable {
        Ok(strip_trailing_newlines(&collapsed).to_string())
    } else {
        Ok(collapsed)
    }
}
