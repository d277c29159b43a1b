//! Window + runtime loop.
//!
//! Owns the `winit` event loop and the window, and ties the renderer's
//! lifetime to the window it draws into.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
