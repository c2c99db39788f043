//! Streaming markdown rendering for terminals.
//!
//! Markdown arrives in arbitrary chunks (typically tokens from a language model). Closed blocks
//! are committed to a document that is re-rendered in full on every commit, and only the bytes
//! the output is missing are written. Feeding a document in any chunking and then closing the
//! stream produces exactly the output of rendering the whole document at once.
//!
//! Invariant: terminal control output goes through `core::output::OutputGate::flush(..)`;
//! rendered snapshots go through `stream::reconcile::Reconciler`.
//!
//! # Public API Overview
//! - [`StreamRenderer`] with [`StreamOptions`]: `write`, `flush`, `close`, `resize`.
//! - Sinks: [`Sink`], [`Resettable`], [`BufferSink`], [`AppendOnlySink`], and on unix
//!   [`ProcessTerminal`] with [`ResizeWatcher`].
//! - The renderer seam: [`DocumentRenderer`] and [`RenderBackend`], with the bundled
//!   [`MarkdownBackend`] in a [`StyleProfile`].
//! - Building blocks: the line classifier and [`BlockMachine`], [`Reconciler`],
//!   [`find_safe_point`].

#![allow(clippy::too_many_arguments)]

pub mod config;
pub mod error;
pub mod logging;

pub mod block;
pub mod core;
pub mod platform;
pub mod render;
pub mod stream;

pub use crate::block::{classify_line, BlockKind, BlockMachine, BlockState, LineClass};
pub use crate::config::EnvConfig;
pub use crate::core::sink::{AppendOnlySink, BufferSink, Resettable, Sink};
pub use crate::core::terminal::{clear_lines, count_lines};
pub use crate::error::{RenderError, StreamError};
pub use crate::logging::init_file_logging;
pub use crate::render::highlight::prewarm as prewarm_highlighting;
pub use crate::render::{
    DocumentRenderer, MarkdownBackend, MarkdownRenderer, MarkdownTheme, RenderBackend,
    StyleProfile,
};
pub use crate::stream::{
    find_safe_point, PartialPreview, ReconcileMode, Reconciler, StreamOptions, StreamRenderer,
};

#[cfg(unix)]
pub use crate::platform::{ProcessTerminal, ResizeWatcher};

/// ANSI-aware wrapping helper.
pub use crate::core::text::wrap::wrap_text_with_ansi;
/// Visible width helper that ignores ANSI control sequences.
pub use crate::core::text::width::visible_width;
