use anyhow::Result;
use winit::window::Window;

use crate::render::Renderer;
use crate::time::FrameTime;

use super::app::AppControl;

/// Per-frame context passed to [`super::App::on_frame`].
///
/// `'a` is the callback; `'w` is the window borrow carried by the renderer.
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub renderer: &'a mut Renderer<'w>,
    pub time: FrameTime,
}

impl<'w> FrameCtx<'_, 'w> {
    /// Runs one frame: begin, clear color and depth, `draw`, end and present.
    ///
    /// Skipped frames return `Continue` without calling `draw`. Errors from
    /// the surface or from `draw` are logged and end the run.
    pub fn render<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&mut Renderer<'w>) -> Result<()>,
    {
        match self.renderer.begin_frame() {
            Ok(true) => {}
            Ok(false) => return AppControl::Continue,
            Err(e) => {
                log::error!("frame {}: {e:#}", self.time.frame_index);
                return AppControl::Exit;
            }
        }

        let config = self.renderer.config().clone();
        self.renderer.clear_render_target(config.clear_color);
        self.renderer.clear_depth(config.depth_clear);

        let result = draw(&mut *self.renderer);

        self.window.pre_present_notify();
        self.renderer.end_frame();

        match result {
            Ok(()) => AppControl::Continue,
            Err(e) => {
                log::error!("frame {}: {e:#}", self.time.frame_index);
                AppControl::Exit
            }
        }
    }
}
