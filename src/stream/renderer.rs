//! The streaming renderer: one instance per markdown stream.

use std::io;

use tracing::debug;

use crate::block::{BlockMachine, BlockState, Effect};
use crate::core::output::OutputGate;
use crate::core::sink::Sink;
use crate::error::StreamError;
use crate::render::{render_snapshot, MarkdownBackend, RenderBackend, StyleProfile};
use crate::stream::preview::PartialPreview;
use crate::stream::reconcile::{ReconcileMode, Reconciler};

/// Construction options for [`StreamRenderer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Style profile for [`StreamRenderer::markdown`]; other backends carry their own.
    pub style: StyleProfile,
    /// Render width in cells. `None` renders flowing output with no cursor control.
    pub width: Option<usize>,
    /// Preview the open block. Needs a width.
    pub partial_preview: bool,
}

impl StreamOptions {
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_partial_preview(mut self, enabled: bool) -> Self {
        self.partial_preview = enabled;
        self
    }
}

/// Renders an arbitrarily chunked markdown byte stream into a [`Sink`].
///
/// Closed blocks are appended to a committed document which is re-rendered in full on every
/// commit; the reconciler then writes only what the sink is missing. The output after
/// [`close`](Self::close) does not depend on how the input was split into chunks.
pub struct StreamRenderer<B: RenderBackend, S: Sink> {
    backend: B,
    renderer: B::Renderer,
    sink: S,
    width: Option<usize>,
    partial_preview: bool,
    machine: BlockMachine,
    committed: String,
    tail: Vec<u8>,
    reconciler: Reconciler,
    preview: PartialPreview,
    gate: OutputGate,
    closed: bool,
}

impl<S: Sink> StreamRenderer<MarkdownBackend, S> {
    /// A renderer using the bundled markdown backend in `options.style`.
    pub fn markdown(sink: S, options: StreamOptions) -> Result<Self, StreamError> {
        Self::new(MarkdownBackend::new(options.style), sink, options)
    }
}

impl<B: RenderBackend, S: Sink> StreamRenderer<B, S> {
    /// Fails if the backend cannot build a renderer for `options.width`.
    pub fn new(backend: B, sink: S, options: StreamOptions) -> Result<Self, StreamError> {
        let renderer = backend.build(options.width)?;
        Ok(Self {
            backend,
            renderer,
            sink,
            width: options.width,
            partial_preview: options.partial_preview,
            machine: BlockMachine::new(),
            committed: String::new(),
            tail: Vec::new(),
            reconciler: Reconciler::new(),
            preview: PartialPreview::new(),
            gate: OutputGate::new(),
            closed: false,
        })
    }

    /// Raw markdown of every block closed so far.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn width(&self) -> Option<usize> {
        self.width
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Feeds a chunk. Every complete line goes through the block machine; a trailing partial
    /// line waits for its newline (or for [`flush`](Self::flush)).
    ///
    /// Returns `data.len()`. On a render error the lines not yet dispatched stay buffered.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        self.tail.extend_from_slice(data);

        while let Some(newline) = self.tail.iter().position(|byte| *byte == b'\n') {
            let line = String::from_utf8_lossy(&self.tail[..=newline]).into_owned();
            self.tail.drain(..=newline);
            let effects = self.machine.push_line(&line);
            self.apply(effects)?;
        }

        if self.preview_enabled() {
            self.update_preview()?;
        }
        Ok(data.len())
    }

    /// Closes the open block and reconciles the final render, trailing newlines included.
    ///
    /// Writing may continue afterwards.
    pub fn flush(&mut self) -> Result<(), StreamError> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        self.finish()
    }

    /// Flushes, then refuses further input. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), StreamError> {
        if self.closed {
            return Ok(());
        }
        self.finish()?;
        self.closed = true;
        debug!(committed = self.committed.len(), "stream closed");
        Ok(())
    }

    /// Re-renders the committed document at `width`, replacing everything on the sink.
    ///
    /// Once something has been emitted this needs a resettable sink.
    pub fn resize(&mut self, width: usize) -> Result<(), StreamError> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        if self.width == Some(width) {
            return Ok(());
        }

        self.renderer = self.backend.build(Some(width))?;
        self.width = Some(width);
        let sink_dirty = self.reconciler.emitted_len() > 0 || self.preview.is_active();
        self.preview.discard();

        let snapshot = render_snapshot(&mut self.renderer, &self.committed, true)?;
        let written = self.reconciler.rewrite(&mut self.sink, &snapshot, sink_dirty)?;
        debug!(width, written, "resized");

        if self.preview_enabled() {
            self.update_preview()?;
        }
        Ok(())
    }

    fn preview_enabled(&self) -> bool {
        self.partial_preview && self.width.is_some()
    }

    fn finish(&mut self) -> Result<(), StreamError> {
        if !self.tail.is_empty() {
            let line = String::from_utf8_lossy(&self.tail).into_owned();
            self.tail.clear();
            let effects = self.machine.push_line(&line);
            self.apply(effects)?;
        }
        let effects = self.machine.finish();
        self.apply(effects)?;

        self.retract_preview()?;
        let snapshot = render_snapshot(&mut self.renderer, &self.committed, false)?;
        self.reconciler
            .reconcile(&mut self.sink, &snapshot, ReconcileMode::Rewrite)?;
        Ok(())
    }

    /// Appends every effect to the committed document, then renders once if a block closed.
    fn apply(&mut self, effects: Vec<Effect>) -> Result<(), StreamError> {
        let mut committed_block = false;
        for effect in effects {
            match effect {
                Effect::Passthrough(text) => self.committed.push_str(&text),
                Effect::Commit { kind, lines } => {
                    let line_count = lines.len();
                    for line in lines {
                        self.committed.push_str(&line);
                    }
                    debug!(
                        ?kind,
                        lines = line_count,
                        committed = self.committed.len(),
                        "block committed"
                    );
                    committed_block = true;
                }
            }
        }
        if !committed_block {
            return Ok(());
        }

        self.retract_preview()?;
        let snapshot = render_snapshot(&mut self.renderer, &self.committed, true)?;
        self.reconciler
            .reconcile(&mut self.sink, &snapshot, ReconcileMode::Incremental)?;
        Ok(())
    }

    fn retract_preview(&mut self) -> Result<(), StreamError> {
        self.gate.extend(self.preview.clear());
        self.gate.flush(&mut self.sink)?;
        Ok(())
    }

    fn update_preview(&mut self) -> Result<(), StreamError> {
        let Some(width) = self.width else {
            return Ok(());
        };
        let valid = std::str::from_utf8(&self.tail).map_or_else(|err| err.valid_up_to(), str::len);
        let tail = std::str::from_utf8(&self.tail[..valid]).unwrap_or_default();

        let mut content = self.machine.pending().concat();
        content.push_str(tail);
        let verbatim = matches!(self.machine.state(), BlockState::InFencedCode { .. });

        let cmds = self.preview.update(
            &content,
            verbatim,
            &mut self.renderer,
            width,
            self.reconciler.last_rendered(),
        )?;
        self.gate.extend(cmds);
        self.gate.flush(&mut self.sink)?;
        Ok(())
    }
}

/// Lets the renderer sit wherever a writer is accepted. `flush` here only forwards to the
/// sink's own buffering; finalize with [`StreamRenderer::close`].
impl<B: RenderBackend, S: Sink> io::Write for StreamRenderer<B, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        StreamRenderer::write(self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use pretty_assertions::assert_eq;

    use super::{StreamOptions, StreamRenderer};
    use crate::core::sink::{AppendOnlySink, BufferSink};
    use crate::error::{RenderError, StreamError};
    use crate::render::{DocumentRenderer, RenderBackend};

    /// Renders each block's first line upper-cased, prefixed by the width.
    #[derive(Clone, Copy)]
    struct Shout;

    struct ShoutRenderer {
        width: Option<usize>,
    }

    impl RenderBackend for Shout {
        type Renderer = ShoutRenderer;

        fn build(&self, width: Option<usize>) -> Result<ShoutRenderer, RenderError> {
            if width == Some(0) {
                return Err(RenderError::InvalidWidth);
            }
            Ok(ShoutRenderer { width })
        }
    }

    impl DocumentRenderer for ShoutRenderer {
        fn render(&mut self, markdown: &str) -> Result<String, RenderError> {
            let tag = self.width.map_or_else(|| "~".to_string(), |w| w.to_string());
            let mut out = String::new();
            for line in markdown.lines().filter(|line| !line.trim().is_empty()) {
                out.push_str(&format!("{tag}:{}\n", line.to_uppercase()));
            }
            Ok(out)
        }
    }

    fn buffer_renderer(options: StreamOptions) -> StreamRenderer<Shout, BufferSink> {
        StreamRenderer::new(Shout, BufferSink::new(), options).expect("renderer")
    }

    #[test]
    fn list_items_appear_one_marker_late() {
        let mut stream = buffer_renderer(StreamOptions::default());
        stream.write(b"1. First\n").unwrap();
        assert_eq!(stream.sink().contents(), "");
        stream.write(b"2. Second\n").unwrap();
        assert_eq!(stream.sink().contents(), "~:1. FIRST");
        stream.write(b"3. Third\n").unwrap();
        assert_eq!(stream.sink().contents(), "~:1. FIRST\n~:2. SECOND");
        stream.close().unwrap();
        assert_eq!(
            stream.sink().contents(),
            "~:1. FIRST\n~:2. SECOND\n~:3. THIRD\n"
        );
    }

    #[test]
    fn partial_lines_wait_for_their_newline() {
        let mut stream = buffer_renderer(StreamOptions::default());
        assert_eq!(stream.write(b"# Ti").unwrap(), 4);
        assert_eq!(stream.sink().contents(), "");
        stream.write(b"tle\n").unwrap();
        assert_eq!(stream.sink().contents(), "~:# TITLE");
        assert_eq!(stream.committed(), "# Title\n");
    }

    #[test]
    fn shorter_fence_inside_code_is_content() {
        let mut stream = buffer_renderer(StreamOptions::default());
        stream.write(b"````\n```\nstill code\n").unwrap();
        assert_eq!(stream.sink().contents(), "");
        stream.write(b"````\n").unwrap();
        assert_eq!(
            stream.sink().contents(),
            "~:````\n~:```\n~:STILL CODE\n~:````"
        );
    }

    #[test]
    fn resize_rewrites_once_at_the_new_width() {
        let mut stream = buffer_renderer(StreamOptions::default().with_width(40));
        stream.write(b"# Head\n\npara\n\n").unwrap();
        assert_eq!(stream.sink().contents(), "40:# HEAD\n40:PARA");
        stream.resize(72).unwrap();
        assert_eq!(stream.sink().contents(), "72:# HEAD\n72:PARA");
        assert_eq!(stream.sink().resets(), 1);
        assert_eq!(stream.width(), Some(72));
    }

    #[test]
    fn resize_to_zero_fails() {
        let mut stream = buffer_renderer(StreamOptions::default().with_width(40));
        assert!(matches!(
            stream.resize(0),
            Err(StreamError::Render(RenderError::InvalidWidth))
        ));
    }

    #[test]
    fn construction_fails_for_an_invalid_width() {
        let result = StreamRenderer::new(
            Shout,
            BufferSink::new(),
            StreamOptions::default().with_width(0),
        );
        assert!(matches!(
            result,
            Err(StreamError::Render(RenderError::InvalidWidth))
        ));
    }

    #[test]
    fn writes_after_close_are_rejected() {
        let mut stream = buffer_renderer(StreamOptions::default());
        stream.write(b"text").unwrap();
        stream.close().unwrap();
        stream.close().unwrap();
        assert!(matches!(stream.write(b"more"), Err(StreamError::Closed)));
        assert!(matches!(stream.flush(), Err(StreamError::Closed)));
        assert_eq!(stream.sink().contents(), "~:TEXT\n");
    }

    #[test]
    fn append_only_sink_accepts_growing_output() {
        let sink = AppendOnlySink::new(Vec::new());
        let mut stream = StreamRenderer::new(Shout, sink, StreamOptions::default()).unwrap();
        stream.write(b"# A\n\nbody\n").unwrap();
        stream.close().unwrap();
        let bytes = stream.into_sink().into_inner();
        assert_eq!(String::from_utf8(bytes).unwrap(), "~:# A\n~:BODY\n");
    }

    #[test]
    fn resize_on_a_used_append_only_sink_is_rejected() {
        let sink = AppendOnlySink::new(Vec::new());
        let mut stream = StreamRenderer::new(Shout, sink, StreamOptions::default()).unwrap();
        stream.write(b"# A\n").unwrap();
        assert!(stream.resize(10).unwrap_err().is_non_resettable());
    }

    #[test]
    fn io_write_feeds_the_stream() {
        let mut stream = buffer_renderer(StreamOptions::default());
        write!(stream, "# One\n\ntwo").unwrap();
        stream.close().unwrap();
        assert_eq!(stream.sink().contents(), "~:# ONE\n~:TWO\n");
    }

    #[test]
    fn preview_shows_the_safe_prefix_and_retracts_before_commit() {
        let options = StreamOptions::default()
            .with_width(80)
            .with_partial_preview(true);
        let mut stream = buffer_renderer(options);
        stream.write(b"# T\n").unwrap();
        stream.write(b"some **bo").unwrap();
        assert_eq!(stream.sink().contents(), "80:# T\n80:SOME");

        stream.write(b"ld** end\n\n").unwrap();
        let expected_clear = "\x1b[1G\x1b[J\x1b[1A\x1b[7G";
        assert_eq!(
            stream.sink().contents(),
            format!("80:# T\n80:SOME{expected_clear}\n80:SOME **BOLD** END")
        );
    }

    #[test]
    fn preview_is_off_without_a_width() {
        let options = StreamOptions::default().with_partial_preview(true);
        let mut stream = buffer_renderer(options);
        stream.write(b"draft text").unwrap();
        assert_eq!(stream.sink().contents(), "");
    }
}
