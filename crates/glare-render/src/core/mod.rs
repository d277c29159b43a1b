//! The contract between the window runtime and the application: lifecycle
//! callbacks and the per-frame context.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::FrameCtx;
