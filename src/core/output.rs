//! Typed terminal output commands and a single output gate.
//!
//! Invariant: everything the stream renderer emits flows through `OutputGate::flush(..)`.

use std::io;

use crate::core::sink::Sink;
use crate::core::terminal::{clear_lines, cursor_column, cursor_up};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCmd {
    /// Rendered text (UTF-8, may contain SGR sequences).
    Bytes(String),
    /// Cursor up `n` rows, column 1, erase to end of screen.
    ClearLines(usize),
    /// Cursor up `n` rows, column unchanged.
    CursorUp(usize),
    /// Move to a 1-based column on the current row.
    CursorColumn(usize),
}

impl TerminalCmd {
    pub fn bytes(data: impl Into<String>) -> Self {
        Self::Bytes(data.into())
    }

    fn encode(&self) -> String {
        match self {
            Self::Bytes(data) => data.clone(),
            Self::ClearLines(n) => clear_lines(*n),
            Self::CursorUp(n) => cursor_up(*n),
            Self::CursorColumn(column) => cursor_column(*column),
        }
    }
}

#[derive(Debug, Default)]
pub struct OutputGate {
    cmds: Vec<TerminalCmd>,
}

impl OutputGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend<I>(&mut self, cmds: I)
    where
        I: IntoIterator<Item = TerminalCmd>,
    {
        self.cmds.extend(cmds);
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    /// Encode the buffered commands and write them to `sink` as one chunk.
    ///
    /// On error the commands are dropped; nothing is retried.
    pub fn flush<S: Sink + ?Sized>(&mut self, sink: &mut S) -> io::Result<()> {
        let encoded: String = self.cmds.drain(..).map(|cmd| cmd.encode()).collect();
        if encoded.is_empty() {
            return Ok(());
        }
        sink.write(&encoded)
    }
}
