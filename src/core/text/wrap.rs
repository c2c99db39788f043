//! Width-aware word wrapping that carries SGR styles across wrapped rows.

use unicode_segmentation::UnicodeSegmentation;

use super::ansi::{extract_ansi_code, AnsiCodeTracker};
use super::width::{grapheme_width, next_ansi_or_end, visible_width};

/// Wraps every `\n`-separated line of `text` to `width` cells.
///
/// Styles open at the end of one input line are re-opened at the start of the next, and wrapped
/// rows are right-trimmed. A zero width yields a single empty row.
pub fn wrap_text_with_ansi(text: &str, width: usize) -> Vec<String> {
    if text.is_empty() || width == 0 {
        return vec![String::new()];
    }

    let mut rows = Vec::new();
    let mut tracker = AnsiCodeTracker::default();
    for (idx, input_line) in text.split('\n').enumerate() {
        let mut line = if idx == 0 {
            String::new()
        } else {
            tracker.active_codes()
        };
        line.push_str(input_line);
        rows.extend(wrap_single_line(&line, width));
        feed_tracker(input_line, &mut tracker);
    }

    rows.into_iter()
        .map(|row| row.trim_end().to_string())
        .collect()
}

/// A run of spaces or a run of non-space text, with any escapes that preceded it attached.
struct Token {
    text: String,
    width: usize,
    is_space: bool,
}

fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut pending_ansi = String::new();
    let mut idx = 0;

    while idx < line.len() {
        if let Some(ansi) = extract_ansi_code(line, idx) {
            pending_ansi.push_str(ansi.code);
            idx += ansi.length;
            continue;
        }
        let Some(ch) = line[idx..].chars().next() else {
            break;
        };
        let is_space = ch == ' ';
        let starts_new = tokens.last().map_or(true, |last| last.is_space != is_space);
        if starts_new {
            tokens.push(Token {
                text: String::new(),
                width: 0,
                is_space,
            });
        }
        if let Some(token) = tokens.last_mut() {
            token.text.push_str(&pending_ansi);
            pending_ansi.clear();
            token.text.push(ch);
        }
        idx += ch.len_utf8();
    }

    if !pending_ansi.is_empty() {
        match tokens.last_mut() {
            Some(token) => token.text.push_str(&pending_ansi),
            None => tokens.push(Token {
                text: pending_ansi,
                width: 0,
                is_space: false,
            }),
        }
    }

    for token in &mut tokens {
        token.width = visible_width(&token.text);
    }
    tokens
}

fn wrap_single_line(line: &str, width: usize) -> Vec<String> {
    if visible_width(line) <= width {
        return vec![line.to_string()];
    }

    let mut tracker = AnsiCodeTracker::default();
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for token in tokenize(line) {
        if token.width > width && !token.is_space {
            if current_width > 0 {
                push_row(&mut rows, &current, &tracker);
                current.clear();
                current_width = 0;
            }
            let mut pieces = break_long_word(&token.text, width, &mut tracker);
            if let Some(last) = pieces.pop() {
                rows.extend(pieces);
                current_width = visible_width(&last);
                current = last;
            }
            continue;
        }

        if current_width + token.width > width && current_width > 0 {
            push_row(&mut rows, &current, &tracker);
            current = tracker.active_codes();
            current_width = 0;
            if !token.is_space {
                current.push_str(&token.text);
                current_width = token.width;
            }
        } else {
            current.push_str(&token.text);
            current_width += token.width;
        }
        feed_tracker(&token.text, &mut tracker);
    }

    if !current.is_empty() {
        rows.push(current);
    }
    rows
}

fn push_row(rows: &mut Vec<String>, current: &str, tracker: &AnsiCodeTracker) {
    let mut row = current.trim_end().to_string();
    row.push_str(tracker.line_end_reset());
    rows.push(row);
}

fn break_long_word(word: &str, width: usize, tracker: &mut AnsiCodeTracker) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = tracker.active_codes();
    let mut current_width = 0;
    let mut idx = 0;

    while idx < word.len() {
        if let Some(ansi) = extract_ansi_code(word, idx) {
            current.push_str(ansi.code);
            tracker.process(ansi.code);
            idx += ansi.length;
            continue;
        }
        let text_end = next_ansi_or_end(word, idx);
        for grapheme in word[idx..text_end].graphemes(true) {
            let grapheme_cells = grapheme_width(grapheme);
            if current_width + grapheme_cells > width && current_width > 0 {
                current.push_str(tracker.line_end_reset());
                pieces.push(std::mem::replace(&mut current, tracker.active_codes()));
                current_width = 0;
            }
            current.push_str(grapheme);
            current_width += grapheme_cells;
        }
        idx = text_end;
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn feed_tracker(text: &str, tracker: &mut AnsiCodeTracker) {
    let mut idx = 0;
    while idx < text.len() {
        match extract_ansi_code(text, idx) {
            Some(ansi) => {
                tracker.process(ansi.code);
                idx += ansi.length;
            }
            None => idx += text[idx..].chars().next().map_or(1, char::len_utf8),
        }
    }
}
