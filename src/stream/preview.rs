//! Speculative preview of the still-open block.
//!
//! Only the prefix of the open block free of unclosed inline markup is shown, so a guess never
//! flashes half-parsed emphasis or link syntax. The preview is retracted before any committed
//! output is written.

use tracing::debug;

use crate::core::output::TerminalCmd;
use crate::core::terminal::{count_lines, ERASE_TO_END_OF_SCREEN};
use crate::core::text::width::visible_width;
use crate::error::RenderError;
use crate::render::{render_snapshot, DocumentRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    Code,
    Strong(u8),
    Emphasis(u8),
    Strike,
    Link,
}

/// Byte offset of the longest prefix of `content` with no unclosed inline span.
///
/// Code spans, strong and emphasis runs, strikethrough and link text are tracked; a span still
/// open at the end pulls the offset back to its opening marker, and the earliest such marker
/// wins. Backslash escapes are skipped as pairs. Trailing spaces and tabs are trimmed, keeping
/// at least one character.
pub fn find_safe_point(content: &str) -> usize {
    let bytes = content.as_bytes();
    let mut open: Vec<(Span, usize)> = Vec::new();
    let mut cut: Option<usize> = None;
    let mut idx = 0;

    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => {
                idx += 1;
                if let Some(ch) = content.get(idx..).and_then(|rest| rest.chars().next()) {
                    idx += ch.len_utf8();
                }
            }
            b'`' => {
                let run = run_length(bytes, idx, b'`');
                match find_backtick_run(bytes, idx + run, run) {
                    Some(end) => idx = end,
                    None => {
                        open.push((Span::Code, idx));
                        break;
                    }
                }
            }
            marker @ (b'*' | b'_') => {
                let run = run_length(bytes, idx, marker);
                let mut offset = 0;
                while offset < run {
                    let width = if run - offset >= 2 { 2 } else { 1 };
                    let span = if width == 2 {
                        Span::Strong(marker)
                    } else {
                        Span::Emphasis(marker)
                    };
                    if let Some(pos) = open.iter().rposition(|(kind, _)| *kind == span) {
                        open.remove(pos);
                    } else if can_open(bytes, idx, idx + run, marker) {
                        open.push((span, idx + offset));
                    }
                    offset += width;
                }
                idx += run;
            }
            b'~' => {
                let run = run_length(bytes, idx, b'~');
                if run >= 2 {
                    if let Some(pos) = open.iter().rposition(|(kind, _)| *kind == Span::Strike) {
                        open.remove(pos);
                    } else {
                        open.push((Span::Strike, idx));
                    }
                }
                idx += run;
            }
            b'[' => {
                open.push((Span::Link, idx));
                idx += 1;
            }
            b']' => {
                let Some(pos) = open.iter().rposition(|(kind, _)| *kind == Span::Link) else {
                    idx += 1;
                    continue;
                };
                let (_, start) = open.remove(pos);
                idx += 1;
                match bytes.get(idx) {
                    None => {
                        cut = Some(start);
                        break;
                    }
                    Some(b'(') => match find_closing(bytes, idx, b'(', b')') {
                        Some(end) => idx = end,
                        None => {
                            cut = Some(start);
                            break;
                        }
                    },
                    Some(b'[') => match find_closing(bytes, idx, b'[', b']') {
                        Some(end) => idx = end,
                        None => {
                            cut = Some(start);
                            break;
                        }
                    },
                    Some(_) => {}
                }
            }
            _ => idx += 1,
        }
    }

    let mut end = open
        .iter()
        .map(|(_, pos)| *pos)
        .chain(cut)
        .min()
        .unwrap_or(bytes.len());
    while end > 1 && matches!(bytes[end - 1], b' ' | b'\t') {
        end -= 1;
    }
    end
}

fn run_length(bytes: &[u8], start: usize, marker: u8) -> usize {
    bytes[start..].iter().take_while(|b| **b == marker).count()
}

/// End offset of the next backtick run of exactly `len` at or after `from`.
fn find_backtick_run(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut idx = from;
    while idx < bytes.len() {
        if bytes[idx] == b'`' {
            let run = run_length(bytes, idx, b'`');
            if run == len {
                return Some(idx + run);
            }
            idx += run;
        } else {
            idx += 1;
        }
    }
    None
}

/// Offset just past the bracket closing the one at `open_at`, honouring nesting and escapes.
fn find_closing(bytes: &[u8], open_at: usize, open: u8, close: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut idx = open_at;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 1,
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
        idx += 1;
    }
    None
}

/// A run opens a span unless whitespace follows it, or it is an intraword `_`.
fn can_open(bytes: &[u8], run_start: usize, run_end: usize, marker: u8) -> bool {
    if bytes.get(run_end).is_some_and(|b| b.is_ascii_whitespace()) {
        return false;
    }
    let preceded_by_word = run_start > 0 && bytes[run_start - 1].is_ascii_alphanumeric();
    !(marker == b'_' && preceded_by_word)
}

/// Outstanding speculative output.
#[derive(Debug, Default)]
pub struct PartialPreview {
    /// The raw prefix currently on screen.
    prefix: String,
    rows: usize,
    /// Column of the committed output's end, when the preview started on a fresh row.
    anchor_column: Option<usize>,
}

impl PartialPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.rows > 0
    }

    #[cfg(test)]
    fn rows(&self) -> usize {
        self.rows
    }

    /// Commands erasing the preview and putting the cursor back where committed output ended.
    pub fn clear(&mut self) -> Vec<TerminalCmd> {
        if !self.is_active() {
            self.discard();
            return Vec::new();
        }
        let mut cmds = if self.rows > 1 {
            vec![TerminalCmd::ClearLines(self.rows - 1)]
        } else {
            vec![
                TerminalCmd::CursorColumn(1),
                TerminalCmd::bytes(ERASE_TO_END_OF_SCREEN),
            ]
        };
        if let Some(column) = self.anchor_column {
            cmds.push(TerminalCmd::CursorUp(1));
            cmds.push(TerminalCmd::CursorColumn(column + 1));
        }
        debug!(rows = self.rows, "preview retracted");
        self.discard();
        cmds
    }

    /// Forgets the preview without erasing it, for when the screen is reset anyway.
    pub fn discard(&mut self) {
        self.prefix.clear();
        self.rows = 0;
        self.anchor_column = None;
    }

    /// Re-previews `content` if its safe prefix changed.
    ///
    /// `verbatim` content (an open code fence) is shown whole. `committed` is what the sink
    /// currently shows; the preview starts on a fresh row below it.
    pub fn update<R: DocumentRenderer + ?Sized>(
        &mut self,
        content: &str,
        verbatim: bool,
        renderer: &mut R,
        terminal_width: usize,
        committed: &str,
    ) -> Result<Vec<TerminalCmd>, RenderError> {
        let safe = if verbatim {
            content.len()
        } else {
            find_safe_point(content)
        };
        let prefix = &content[..safe];
        if prefix == self.prefix {
            return Ok(Vec::new());
        }

        let mut cmds = self.clear();
        if prefix.trim().is_empty() {
            return Ok(cmds);
        }
        let rendered = render_snapshot(renderer, prefix, true)?;
        if rendered.is_empty() {
            self.prefix = prefix.to_string();
            return Ok(cmds);
        }

        let fresh_row = !committed.is_empty() && !committed.ends_with('\n');
        let mut output = String::with_capacity(rendered.len() + 1);
        if fresh_row {
            output.push('\n');
            let last_line = committed.rsplit('\n').next().unwrap_or_default();
            self.anchor_column = Some(visible_width(last_line) % terminal_width.max(1));
        }
        output.push_str(&rendered);
        cmds.push(TerminalCmd::Bytes(output));

        self.rows = count_lines(&format!("{rendered}\n"), terminal_width);
        debug!(safe, rows = self.rows, "preview updated");
        self.prefix = prefix.to_string();
        Ok(cmds)
    }
}
