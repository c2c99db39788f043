//! Display width of styled text.

use emojis::get as emoji_get;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use super::ansi::extract_ansi_code;

/// Tabs are normalized to two spaces before rendering; stray tabs measure the same.
const TAB_WIDTH: usize = 2;

pub fn grapheme_width(grapheme: &str) -> usize {
    if grapheme.is_empty() {
        return 0;
    }
    if emoji_get(grapheme).is_some() {
        return 2;
    }

    grapheme
        .chars()
        .map(|ch| match ch {
            '\t' => TAB_WIDTH,
            _ => UnicodeWidthChar::width(ch).unwrap_or(0),
        })
        .sum()
}

/// Terminal cells occupied by `input`, ignoring escape sequences.
pub fn visible_width(input: &str) -> usize {
    let mut width = 0;
    let mut idx = 0;
    while idx < input.len() {
        if let Some(ansi) = extract_ansi_code(input, idx) {
            idx += ansi.length;
            continue;
        }
        let text_end = next_ansi_or_end(input, idx);
        width += input[idx..text_end]
            .graphemes(true)
            .map(grapheme_width)
            .sum::<usize>();
        idx = text_end;
    }
    width
}

/// Byte offset of the next escape sequence at or after `idx`, or the end of `input`.
pub(crate) fn next_ansi_or_end(input: &str, mut idx: usize) -> usize {
    while idx < input.len() {
        if extract_ansi_code(input, idx).is_some() {
            break;
        }
        idx += input[idx..].chars().next().map_or(1, char::len_utf8);
    }
    idx
}
