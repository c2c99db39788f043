//! Core interfaces: sinks, the terminal controller, the output gate and text helpers.

pub mod output;
pub mod sink;
pub mod terminal;
pub mod text;
