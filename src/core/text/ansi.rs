//! ANSI escape parsing and SGR style tracking.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsiCodeKind {
    Csi,
    Osc,
    Apc,
    Dcs,
    Ss3,
}

/// One escape sequence found at a byte offset of a rendered string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnsiCode<'a> {
    pub code: &'a str,
    pub length: usize,
    pub kind: AnsiCodeKind,
}

/// Parses the escape sequence starting at `pos`, if any.
///
/// Returns `None` for plain text and for sequences that are not terminated yet.
pub fn extract_ansi_code(input: &str, pos: usize) -> Option<AnsiCode<'_>> {
    let bytes = input.as_bytes();
    if pos + 1 >= bytes.len() || bytes[pos] != 0x1b {
        return None;
    }

    let (kind, end) = match bytes[pos + 1] {
        b'[' => (AnsiCodeKind::Csi, csi_end(bytes, pos + 2)?),
        b']' => (AnsiCodeKind::Osc, string_terminator_end(bytes, pos + 2)?),
        b'_' => (AnsiCodeKind::Apc, string_terminator_end(bytes, pos + 2)?),
        b'P' => (AnsiCodeKind::Dcs, string_terminator_end(bytes, pos + 2)?),
        b'O' if pos + 2 < bytes.len() => (AnsiCodeKind::Ss3, pos + 3),
        _ => return None,
    };

    Some(AnsiCode {
        code: &input[pos..end],
        length: end - pos,
        kind,
    })
}

fn csi_end(bytes: &[u8], from: usize) -> Option<usize> {
    bytes[from..]
        .iter()
        .position(|b| (0x40..=0x7e).contains(b))
        .map(|offset| from + offset + 1)
}

fn string_terminator_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut idx = from;
    while idx < bytes.len() {
        match bytes[idx] {
            0x07 => return Some(idx + 1),
            0x1b if bytes.get(idx + 1) == Some(&b'\\') => return Some(idx + 2),
            _ => idx += 1,
        }
    }
    None
}

/// Largest offset `<= pos` at which `text` can be split without cutting a UTF-8 character or an
/// escape sequence in half.
///
/// An unterminated escape that straddles `pos` also pulls the boundary back to its `ESC`.
pub fn ansi_safe_boundary(text: &str, pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }

    let mut idx = 0;
    while idx < pos {
        if text.as_bytes()[idx] == 0x1b {
            match extract_ansi_code(text, idx) {
                Some(ansi) if idx + ansi.length <= pos => {
                    idx += ansi.length;
                    continue;
                }
                _ => return idx,
            }
        }
        idx += 1;
    }

    let mut boundary = pos;
    while !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

/// Tracks the SGR attributes active at a point in a styled string so a wrapped continuation
/// line can re-open them.
#[derive(Debug, Default)]
pub struct AnsiCodeTracker {
    bold: bool,
    dim: bool,
    italic: bool,
    underline: bool,
    inverse: bool,
    strikethrough: bool,
    fg_color: Option<String>,
    bg_color: Option<String>,
}

impl AnsiCodeTracker {
    pub fn process(&mut self, ansi_code: &str) {
        let Some(params) = ansi_code
            .strip_prefix("\x1b[")
            .and_then(|rest| rest.strip_suffix('m'))
        else {
            return;
        };

        if params.is_empty() || params == "0" {
            self.reset();
            return;
        }

        let parts: Vec<&str> = params.split(';').collect();
        let mut idx = 0;
        while idx < parts.len() {
            let code = parts[idx].parse::<u16>().unwrap_or(0);
            if code == 38 || code == 48 {
                let span = match parts.get(idx + 1).copied() {
                    Some("5") => 3,
                    Some("2") => 5,
                    _ => 1,
                };
                if span > 1 && idx + span <= parts.len() {
                    let color = parts[idx..idx + span].join(";");
                    if code == 38 {
                        self.fg_color = Some(color);
                    } else {
                        self.bg_color = Some(color);
                    }
                    idx += span;
                    continue;
                }
            }

            match code {
                0 => self.reset(),
                1 => self.bold = true,
                2 => self.dim = true,
                3 => self.italic = true,
                4 => self.underline = true,
                7 => self.inverse = true,
                9 => self.strikethrough = true,
                22 => {
                    self.bold = false;
                    self.dim = false;
                }
                23 => self.italic = false,
                24 => self.underline = false,
                27 => self.inverse = false,
                29 => self.strikethrough = false,
                39 => self.fg_color = None,
                49 => self.bg_color = None,
                30..=37 | 90..=97 => self.fg_color = Some(code.to_string()),
                40..=47 | 100..=107 => self.bg_color = Some(code.to_string()),
                _ => {}
            }
            idx += 1;
        }
    }

    /// The SGR sequence re-establishing every active attribute, or an empty string.
    pub fn active_codes(&self) -> String {
        let flags = [
            (self.bold, "1"),
            (self.dim, "2"),
            (self.italic, "3"),
            (self.underline, "4"),
            (self.inverse, "7"),
            (self.strikethrough, "9"),
        ];
        let mut codes: Vec<&str> = flags
            .iter()
            .filter(|(active, _)| *active)
            .map(|(_, code)| *code)
            .collect();
        if let Some(color) = self.fg_color.as_deref() {
            codes.push(color);
        }
        if let Some(color) = self.bg_color.as_deref() {
            codes.push(color);
        }

        if codes.is_empty() {
            return String::new();
        }
        format!("\x1b[{}m", codes.join(";"))
    }

    /// Underline is closed at a wrap point so it does not bleed into the padding.
    pub fn line_end_reset(&self) -> &'static str {
        if self.underline {
            "\x1b[24m"
        } else {
            ""
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
