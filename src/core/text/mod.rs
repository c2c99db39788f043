//! Text helpers for styled terminal output: escape parsing, display width, word wrapping.
//!
//! These helpers are pure (string in, string out) so the renderer, the reconciler and the
//! terminal controller can share them without depending on each other.

pub mod ansi;
pub mod width;
pub mod wrap;
