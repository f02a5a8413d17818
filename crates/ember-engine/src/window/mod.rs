//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Windows, and wires each window to its own
//! GPU context.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
