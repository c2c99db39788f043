use thiserror::Error;

/// Failures of the full-document renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render width must be at least one column")]
    InvalidWidth,

    #[error("syntax highlighting theme '{0}' is not bundled")]
    UnknownTheme(String),

    #[error("markdown parser rejected the document: {0}")]
    Parse(String),
}

/// Failures surfaced from `write`, `flush`, `close` and `resize`.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("output sink write failed: {0}")]
    Io(#[from] std::io::Error),

    /// A re-render changed bytes already written to a sink that cannot rewind.
    #[error(
        "non-resettable writer: re-render changed already emitted output \
         ({emitted} bytes emitted, new snapshot is {snapshot} bytes)"
    )]
    NonResettableWriter { emitted: usize, snapshot: usize },

    #[error("stream renderer is closed")]
    Closed,
}

impl StreamError {
    /// Whether this is the append-only-sink reconciliation failure.
    #[must_use]
    pub fn is_non_resettable(&self) -> bool {
        matches!(self, Self::NonResettableWriter { .. })
    }
}
