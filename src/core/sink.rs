//! Output sinks for rendered streams.
//!
//! A sink only has to accept bytes. Sinks that can discard what they already hold expose the
//! [`Resettable`] capability, which unlocks full-rewrite reconciliation.

use std::io::{self, Write};

/// Destination for rendered output.
pub trait Sink {
    /// Write `data` in full.
    fn write(&mut self, data: &str) -> io::Result<()>;

    /// Optional discard-and-restart capability.
    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        None
    }
}

/// Capability of discarding every byte previously written to a sink.
pub trait Resettable {
    fn reset(&mut self) -> io::Result<()>;
}

/// In-memory sink; resetting clears the buffer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferSink {
    buffer: String,
    resets: usize,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &str {
        &self.buffer
    }

    pub fn into_contents(self) -> String {
        self.buffer
    }

    /// Number of times the buffer has been reset.
    pub fn resets(&self) -> usize {
        self.resets
    }
}

impl Sink for BufferSink {
    fn write(&mut self, data: &str) -> io::Result<()> {
        self.buffer.push_str(data);
        Ok(())
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }
}

impl Resettable for BufferSink {
    fn reset(&mut self) -> io::Result<()> {
        self.buffer.clear();
        self.resets += 1;
        Ok(())
    }
}

/// Wraps any writer as a strictly growing sink.
#[derive(Debug)]
pub struct AppendOnlySink<W: Write> {
    inner: W,
}

impl<W: Write> AppendOnlySink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Sink for AppendOnlySink<W> {
    fn write(&mut self, data: &str) -> io::Result<()> {
        self.inner.write_all(data.as_bytes())?;
        self.inner.flush()
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write(&mut self, data: &str) -> io::Result<()> {
        (**self).write(data)
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        (**self).as_resettable()
    }
}

#[cfg(test)]
mod tests {
    use super::{AppendOnlySink, BufferSink, Sink};

    #[test]
    fn buffer_sink_resets() {
        let mut sink = BufferSink::new();
        sink.write("abc").expect("write");
        sink.as_resettable()
            .expect("buffer sink is resettable")
            .reset()
            .expect("reset");
        sink.write("d").expect("write");
        assert_eq!(sink.contents(), "d");
        assert_eq!(sink.resets(), 1);
    }

    #[test]
    fn append_only_sink_has_no_reset() {
        let mut sink = AppendOnlySink::new(Vec::new());
        sink.write("abc").expect("write");
        assert!(sink.as_resettable().is_none());
        assert_eq!(sink.into_inner(), b"abc");
    }
}
