//! Block-level parsing of the incoming markdown stream.

pub mod classify;
pub mod machine;

pub use classify::{classify_line, is_closing_fence, Fence, LineClass};
pub use machine::{transition, Action, BlockKind, BlockMachine, BlockState, Effect, ListContext, Step};
