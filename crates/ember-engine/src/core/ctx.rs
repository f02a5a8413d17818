use winit::window::{Window, WindowId};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::gfx::WgpuContext;
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl FrameCtx<'_, '_> {
    /// Acquires the surface frame, records `draw` through `gfx` and presents.
    ///
    /// `draw` receives the drawable size in physical pixels; the default
    /// framebuffer of `gfx` is the surface frame while it runs. Surface errors
    /// skip the frame, except fatal ones which request exit.
    pub fn render<F>(&mut self, gfx: &mut WgpuContext, draw: F) -> AppControl
    where
        F: FnOnce(&mut WgpuContext, u32, u32),
    {
        let frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let action = self.gpu.handle_surface_error(err);
                log::debug!("surface frame unavailable: {action:?}");
                if action == SurfaceErrorAction::Fatal {
                    return AppControl::Exit;
                }
                return AppControl::Continue;
            }
        };

        gfx.begin_frame(frame.view.clone(), frame.format, frame.width, frame.height);
        draw(gfx, frame.width, frame.height);
        let commands = gfx.finish_frame();

        self.window.window.pre_present_notify();
        self.gpu.present(frame, commands);

        AppControl::Continue
    }
}
