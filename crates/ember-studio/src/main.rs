mod scene;

use std::path::Path;

use anyhow::{Context, Result};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowId;

use ember_engine::audio::oggvorbis::VorbisFile;
use ember_engine::core::{App, AppControl, FrameCtx};
use ember_engine::device::GpuInit;
use ember_engine::gfx::WgpuContext;
use ember_engine::logging::{init_logging, LoggingConfig};
use ember_engine::render::post::{Postprocessor, PostprocessorInit};
use ember_engine::window::{Runtime, RuntimeConfig};

use scene::{Camera, Scene, TriangleRenderer};

/// Radians per second.
const SPIN_SPEED: f32 = 0.6;

/// Bytes decoded from the stream as a smoke check.
const SAMPLE_READ_BYTES: usize = 16 * 1024;

#[derive(Default)]
struct Studio {
    gfx: Option<WgpuContext>,
    stage: Option<Postprocessor>,
    triangle: TriangleRenderer,
    scene: Scene,
}

impl App for Studio {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let gfx = self
            .gfx
            .get_or_insert_with(|| ctx.gpu.create_graphics_context());

        if self.stage.is_none() {
            let size = ctx.gpu.size();
            let init = PostprocessorInit {
                width: size.width,
                height: size.height,
                ..Default::default()
            };
            match Postprocessor::create(gfx, &init) {
                Ok(stage) => self.stage = Some(stage),
                Err(e) => {
                    log::error!("postprocessor setup failed: {e}");
                    return AppControl::Exit;
                }
            }
        }
        let Some(stage) = self.stage.as_ref() else {
            return AppControl::Exit;
        };

        let elapsed = ctx.time.elapsed as f32;
        let camera = Camera {
            angle: elapsed * SPIN_SPEED,
        };
        let (triangle, scene) = (&mut self.triangle, &self.scene);

        ctx.render(gfx, |gfx, width, height| {
            stage.render(gfx, width, height, triangle, scene, &camera, elapsed);
        })
    }

    fn on_exit(&mut self) {
        let Some(gfx) = self.gfx.as_mut() else {
            return;
        };
        self.triangle.destroy(gfx);
        if let Some(stage) = self.stage.take() {
            stage.destroy(gfx);
        }
        log::info!("stage resources released");
    }
}

/// Opens `path` as Ogg Vorbis and logs what it finds.
fn report_stream(path: &Path) -> Result<()> {
    let mut file =
        VorbisFile::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let info = file.info(-1)?;
    log::info!(
        "{}: vorbis v{} {} ch @ {} Hz, bitrate lower/nominal/upper {}/{}/{}",
        file.origin(),
        info.version,
        info.channels,
        info.rate,
        info.bitrate_lower,
        info.bitrate_nominal,
        info.bitrate_upper
    );

    match (file.pcm_total(-1), file.time_total(-1)) {
        (Ok(frames), Ok(seconds)) => log::info!("{frames} frames, {seconds:.2} s"),
        (Err(e), _) | (_, Err(e)) => log::warn!("length unknown: {e}"),
    }

    let mut buf = vec![0u8; SAMPLE_READ_BYTES];
    let read = file.read(&mut buf)?;
    log::info!(
        "decoded {} PCM16 bytes, now at {:.3} s",
        read.bytes_written,
        file.time_tell()?
    );

    file.close();
    Ok(())
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    if let Some(path) = std::env::args_os().nth(1) {
        if let Err(e) = report_stream(Path::new(&path)) {
            log::error!("{e:#}");
        }
    }

    let config = RuntimeConfig {
        title: "Ember Studio".to_string(),
        ..Default::default()
    };
    let gpu_init = GpuInit {
        present_mode: wgpu::PresentMode::AutoVsync,
        ..Default::default()
    };

    Runtime::run(config, gpu_init, Studio::default())
}
