//! Terminal controller: cursor-movement sequences and row accounting for rendered text.

use crate::core::text::width::visible_width;

pub const CURSOR_COLUMN_ONE: &str = "\x1b[1G";
pub const ERASE_TO_END_OF_SCREEN: &str = "\x1b[J";
/// Clears scrollback and screen, then homes the cursor.
pub const CLEAR_ALL: &str = "\x1b[3J\x1b[2J\x1b[H";

/// Moves the cursor up `n` rows, to column 1, and erases everything below it.
///
/// Empty for `n == 0`.
pub fn clear_lines(n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    format!("{}{CURSOR_COLUMN_ONE}{ERASE_TO_END_OF_SCREEN}", cursor_up(n))
}

pub fn cursor_up(n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    format!("\x1b[{n}A")
}

/// Moves the cursor to the 1-based `column` of the current row.
pub fn cursor_column(column: usize) -> String {
    format!("\x1b[{}G", column.max(1))
}

/// Terminal rows occupied by the `\n`-terminated lines of `rendered` at `terminal_width`.
///
/// Every segment before a `\n` counts as `ceil(width / terminal_width)` rows, minimum one; the
/// trailing segment after the last `\n` is not counted.
pub fn count_lines(rendered: &str, terminal_width: usize) -> usize {
    let terminal_width = terminal_width.max(1);
    let mut segments: Vec<&str> = rendered.split('\n').collect();
    segments.pop();
    segments
        .into_iter()
        .map(|segment| visible_width(segment).div_ceil(terminal_width).max(1))
        .sum()
}
