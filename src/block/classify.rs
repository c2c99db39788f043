//! Line classifier: one line of markdown to the block construct it opens.
//!
//! The order of the checks in [`classify_line`] is load-bearing. A Setext underline is only a
//! candidate while a paragraph is open, and then it beats a thematic break.

/// Opening fence of a fenced code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fence {
    pub ch: char,
    pub len: usize,
    /// Leading indent in columns; a tab counts as one.
    pub indent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Blank,
    Heading,
    FencedCodeOpen(Fence),
    ThematicBreak,
    /// A run of `=` or `-` under an open paragraph.
    SetextUnderline,
    Blockquote,
    ListMarker { indent: usize },
    Table,
    Paragraph,
}

/// Leading indent in columns, counting a tab as one column.
pub fn leading_indent(line: &str) -> usize {
    line.chars().take_while(|ch| *ch == ' ' || *ch == '\t').count()
}

pub fn is_blank(line: &str) -> bool {
    strip_line_ending(line).trim().is_empty()
}

pub(crate) fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Classifies `line` (with or without its line ending).
pub fn classify_line(line: &str, in_paragraph: bool) -> LineClass {
    let line = strip_line_ending(line);
    let indent = leading_indent(line);
    let trimmed = line.trim_start_matches([' ', '\t']);
    if trimmed.trim_end().is_empty() {
        return LineClass::Blank;
    }

    if is_heading(trimmed) {
        return LineClass::Heading;
    }
    if let Some((ch, len)) = fence_run(trimmed) {
        return LineClass::FencedCodeOpen(Fence { ch, len, indent });
    }
    if in_paragraph && is_setext_underline(trimmed) {
        return LineClass::SetextUnderline;
    }
    if is_thematic_break(trimmed) {
        return LineClass::ThematicBreak;
    }
    if trimmed.starts_with('>') {
        return LineClass::Blockquote;
    }
    if is_list_marker(trimmed) {
        return LineClass::ListMarker { indent };
    }
    if trimmed.contains('|') {
        return LineClass::Table;
    }
    LineClass::Paragraph
}

/// Whether `line` closes a code block opened by `fence`.
pub fn is_closing_fence(line: &str, fence: &Fence) -> bool {
    let line = strip_line_ending(line);
    if leading_indent(line) > fence.indent.saturating_add(3).max(3) {
        return false;
    }
    let trimmed = line.trim_start_matches([' ', '\t']);
    let run = trimmed.chars().take_while(|ch| *ch == fence.ch).count();
    run >= fence.len && trimmed[run * fence.ch.len_utf8()..].trim().is_empty()
}

/// 1-6 `#` followed by a space, a tab or nothing. A bare run counts so a heading is recognised
/// before its text arrives.
fn is_heading(trimmed: &str) -> bool {
    let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
    (1..=6).contains(&hashes) && matches!(trimmed.as_bytes().get(hashes), None | Some(b' ' | b'\t'))
}

fn fence_run(trimmed: &str) -> Option<(char, usize)> {
    let ch = trimmed.chars().next().filter(|ch| *ch == '`' || *ch == '~')?;
    let len = trimmed.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

fn is_setext_underline(trimmed: &str) -> bool {
    let run = trimmed.trim_end();
    let Some(first) = run.chars().next() else {
        return false;
    };
    (first == '=' || first == '-') && run.chars().all(|ch| ch == first)
}

fn is_thematic_break(trimmed: &str) -> bool {
    let Some(marker) = trimmed.chars().next().filter(|ch| matches!(ch, '-' | '*' | '_')) else {
        return false;
    };
    let mut count = 0;
    for ch in trimmed.chars() {
        match ch {
            ' ' | '\t' => {}
            c if c == marker => count += 1,
            _ => return false,
        }
    }
    count >= 3
}

fn is_list_marker(trimmed: &str) -> bool {
    let bytes = trimmed.as_bytes();
    let followed_by_space = |idx: usize| matches!(bytes.get(idx), None | Some(b' ' | b'\t'));

    if matches!(bytes.first(), Some(b'-' | b'*' | b'+')) {
        return followed_by_space(1);
    }

    let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    (1..=9).contains(&digits)
        && matches!(bytes.get(digits), Some(b'.' | b')'))
        && followed_by_space(digits + 1)
}
