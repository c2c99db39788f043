//! Incremental rendering of a markdown byte stream.

pub mod preview;
pub mod reconcile;
pub mod renderer;

pub use preview::{find_safe_point, PartialPreview};
pub use reconcile::{ReconcileMode, Reconciler};
pub use renderer::{StreamOptions, StreamRenderer};
