//! Snapshot reconciler: moves a sink from the last emitted snapshot to a new one with as few
//! bytes as the sink's capabilities allow.

use tracing::{debug, warn};

use crate::core::sink::Sink;
use crate::core::text::ansi::ansi_safe_boundary;
use crate::error::StreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Mid-stream commit; a changed prefix may be patched by writing the tail only.
    Incremental,
    /// Flush, close or resize; a changed prefix resets the sink and rewrites everything.
    Rewrite,
}

/// Emission state: the bytes the sink holds, as far as this stream knows.
#[derive(Debug, Default)]
pub struct Reconciler {
    last_rendered: String,
    emitted_len: usize,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_rendered(&self) -> &str {
        &self.last_rendered
    }

    pub fn emitted_len(&self) -> usize {
        self.emitted_len
    }

    /// Forgets everything emitted so far.
    pub fn reset(&mut self) {
        self.last_rendered.clear();
        self.emitted_len = 0;
    }

    /// Writes whatever `sink` needs to show `snapshot`. Returns the number of bytes written.
    pub fn reconcile<S: Sink + ?Sized>(
        &mut self,
        sink: &mut S,
        snapshot: &str,
        mode: ReconcileMode,
    ) -> Result<usize, StreamError> {
        if snapshot == self.last_rendered {
            return Ok(0);
        }

        if let Some(suffix) = snapshot.strip_prefix(self.last_rendered.as_str()) {
            sink.write(suffix)?;
            debug!(appended = suffix.len(), total = snapshot.len(), "snapshot extended");
            self.record(snapshot.to_string());
            return Ok(suffix.len());
        }

        let Some(resettable) = sink.as_resettable() else {
            warn!(
                emitted = self.emitted_len,
                snapshot = snapshot.len(),
                "re-render changed emitted output on an append-only sink"
            );
            return Err(StreamError::NonResettableWriter {
                emitted: self.emitted_len,
                snapshot: snapshot.len(),
            });
        };

        if mode == ReconcileMode::Rewrite || snapshot.len() < self.last_rendered.len() {
            resettable.reset()?;
            sink.write(snapshot)?;
            debug!(?mode, bytes = snapshot.len(), "snapshot rewritten");
            self.record(snapshot.to_string());
            return Ok(snapshot.len());
        }

        let boundary = ansi_safe_boundary(snapshot, self.last_rendered.len());
        let tail = &snapshot[boundary..];
        sink.write(tail)?;
        warn!(
            tail = tail.len(),
            offset = boundary,
            "snapshot prefix changed; earlier output is stale until the next rewrite"
        );
        let mut contents = std::mem::take(&mut self.last_rendered);
        contents.push_str(tail);
        self.record(contents);
        Ok(tail.len())
    }

    /// Replaces the sink's contents with `snapshot`.
    ///
    /// The sink is reset first when it holds anything (`sink_dirty`), which requires the reset
    /// capability.
    pub fn rewrite<S: Sink + ?Sized>(
        &mut self,
        sink: &mut S,
        snapshot: &str,
        sink_dirty: bool,
    ) -> Result<usize, StreamError> {
        if sink_dirty || self.emitted_len > 0 {
            let emitted = self.emitted_len;
            let resettable = sink.as_resettable().ok_or(StreamError::NonResettableWriter {
                emitted,
                snapshot: snapshot.len(),
            })?;
            resettable.reset()?;
        }
        self.reset();
        if !snapshot.is_empty() {
            sink.write(snapshot)?;
        }
        debug!(bytes = snapshot.len(), "full rewrite");
        self.record(snapshot.to_string());
        Ok(snapshot.len())
    }

    fn record(&mut self, contents: String) {
        self.emitted_len = contents.len();
        self.last_rendered = contents;
    }
}
