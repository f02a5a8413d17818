use thiserror::Error;

use crate::gfx::{
    BufferId, ClearMask, ColorRgba, FramebufferId, FramebufferStatus, GraphicsContext, ProgramId,
    ProgramSource, RenderbufferId, TextureFilter, TextureId, VertexArrayId,
};

use super::quad::{QuadVertex, SCREEN_QUAD};
use super::scene::SceneRenderer;
use super::{COMPOSITE_FRAGMENT_WGSL, COMPOSITE_VERTEX_WGSL};

/// Name of the scalar uniform fed with elapsed seconds.
pub const TIME_UNIFORM: &str = "time";

/// Stage construction failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetupError {
    #[error("invalid offscreen size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("offscreen framebuffer is incomplete: {0:?}")]
    IncompleteFramebuffer(FramebufferStatus),

    #[error("composite program failed to build: {0}")]
    ShaderBuild(String),
}

/// Construction parameters for [`Postprocessor`].
#[derive(Debug, Clone)]
pub struct PostprocessorInit<'a> {
    /// Offscreen target size in pixels.
    pub width: u32,
    pub height: u32,

    pub vertex_source: &'a str,
    pub fragment_source: &'a str,

    /// Clear color of the offscreen pass.
    pub scene_clear: ColorRgba,
    /// Clear color of the default target before compositing.
    pub composite_clear: ColorRgba,
}

impl Default for PostprocessorInit<'static> {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            vertex_source: COMPOSITE_VERTEX_WGSL,
            fragment_source: COMPOSITE_FRAGMENT_WGSL,
            scene_clear: ColorRgba::new(0.1, 0.1, 0.1, 1.0),
            composite_clear: ColorRgba::white(),
        }
    }
}

/// Renders a scene offscreen, then composites it onto the default target.
///
/// Owns one framebuffer with a color texture and a depth/stencil
/// renderbuffer, the screen-quad buffers and the composite program. All of
/// them are created in [`create`](Self::create) and live until
/// [`destroy`](Self::destroy); nothing is reallocated.
#[derive(Debug)]
pub struct Postprocessor {
    width: u32,
    height: u32,
    scene_clear: ColorRgba,
    composite_clear: ColorRgba,

    framebuffer: FramebufferId,
    texture: TextureId,
    renderbuffer: RenderbufferId,
    vertex_buffer: BufferId,
    vertex_array: VertexArrayId,
    program: ProgramId,
}

impl Postprocessor {
    /// Allocates every stage resource.
    ///
    /// On failure, resources created so far are released before returning.
    pub fn create<C>(ctx: &mut C, init: &PostprocessorInit<'_>) -> Result<Self, SetupError>
    where
        C: GraphicsContext + ?Sized,
    {
        let (width, height) = (init.width, init.height);
        if width == 0 || height == 0 {
            log::error!("postprocessor: refusing {width}x{height} offscreen target");
            return Err(SetupError::InvalidSize { width, height });
        }

        let framebuffer = ctx.create_framebuffer();
        let texture = ctx.create_texture(width, height, TextureFilter::Nearest);
        ctx.framebuffer_texture(framebuffer, texture);
        let renderbuffer = ctx.create_renderbuffer(width, height);
        ctx.framebuffer_renderbuffer(framebuffer, renderbuffer);

        let status = ctx.check_framebuffer_status(framebuffer);
        if status != FramebufferStatus::Complete {
            log::error!("postprocessor: framebuffer incomplete ({status:?})");
            ctx.delete_renderbuffer(renderbuffer);
            ctx.delete_texture(texture);
            ctx.delete_framebuffer(framebuffer);
            return Err(SetupError::IncompleteFramebuffer(status));
        }

        let vertex_buffer = ctx.create_vertex_buffer(bytemuck::cast_slice(&SCREEN_QUAD));
        let vertex_array = ctx.create_vertex_array(vertex_buffer, QuadVertex::LAYOUT);

        let source = ProgramSource {
            vertex: init.vertex_source,
            fragment: init.fragment_source,
            uniforms: &[TIME_UNIFORM],
        };
        let program = match ctx.create_program(&source) {
            Ok(program) => program,
            Err(msg) => {
                log::error!("postprocessor: composite program failed: {msg}");
                ctx.delete_vertex_array(vertex_array);
                ctx.delete_buffer(vertex_buffer);
                ctx.delete_renderbuffer(renderbuffer);
                ctx.delete_texture(texture);
                ctx.delete_framebuffer(framebuffer);
                return Err(SetupError::ShaderBuild(msg));
            }
        };

        log::debug!("postprocessor ready: {width}x{height} offscreen");
        Ok(Self {
            width,
            height,
            scene_clear: init.scene_clear,
            composite_clear: init.composite_clear,
            framebuffer,
            texture,
            renderbuffer,
            vertex_buffer,
            vertex_array,
            program,
        })
    }

    /// Creates the stage behind a guard that destroys it when dropped.
    pub fn scoped<'c, C>(
        ctx: &'c mut C,
        init: &PostprocessorInit<'_>,
    ) -> Result<StageGuard<'c, C>, SetupError>
    where
        C: GraphicsContext + ?Sized,
    {
        let stage = Self::create(ctx, init)?;
        Ok(StageGuard {
            ctx,
            stage: Some(stage),
        })
    }

    /// Runs the offscreen pass, then composites onto the default target.
    ///
    /// The scene renderer runs with the stage framebuffer bound, depth test
    /// on and the viewport covering the offscreen size. `elapsed` feeds the
    /// program's `time` uniform.
    #[allow(clippy::too_many_arguments)]
    pub fn render<C, R>(
        &self,
        ctx: &mut C,
        target_width: u32,
        target_height: u32,
        scene_renderer: &mut R,
        scene: &R::Scene,
        camera: &R::Camera,
        elapsed: f32,
    ) where
        C: GraphicsContext + ?Sized,
        R: SceneRenderer<C> + ?Sized,
    {
        ctx.viewport(0, 0, self.width, self.height);
        ctx.bind_framebuffer(Some(self.framebuffer));
        ctx.clear_color(self.scene_clear);
        ctx.clear(ClearMask::COLOR_DEPTH);
        ctx.set_depth_test(true);
        scene_renderer.render_scene(ctx, scene, camera);

        ctx.viewport(0, 0, target_width, target_height);
        ctx.bind_framebuffer(None);
        ctx.clear_color(self.composite_clear);
        ctx.clear(ClearMask::COLOR);
        ctx.use_program(self.program);
        ctx.bind_vertex_array(self.vertex_array);
        ctx.set_depth_test(false);
        ctx.bind_texture(0, self.texture);
        ctx.uniform_f32(self.program, TIME_UNIFORM, elapsed);
        ctx.draw_triangles(0, SCREEN_QUAD.len() as u32);
    }

    /// Releases every resource in reverse creation order.
    pub fn destroy<C>(self, ctx: &mut C)
    where
        C: GraphicsContext + ?Sized,
    {
        ctx.delete_program(self.program);
        ctx.delete_vertex_array(self.vertex_array);
        ctx.delete_buffer(self.vertex_buffer);
        ctx.delete_renderbuffer(self.renderbuffer);
        ctx.delete_texture(self.texture);
        ctx.delete_framebuffer(self.framebuffer);
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Color texture holding the last offscreen pass.
    #[inline]
    pub fn color_texture(&self) -> TextureId {
        self.texture
    }

    #[inline]
    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }
}

/// [`Postprocessor`] bound to a borrowed context; destroyed on drop.
pub struct StageGuard<'c, C: GraphicsContext + ?Sized> {
    ctx: &'c mut C,
    stage: Option<Postprocessor>,
}

impl<C: GraphicsContext + ?Sized> StageGuard<'_, C> {
    /// See [`Postprocessor::render`].
    pub fn render<R>(
        &mut self,
        target_width: u32,
        target_height: u32,
        scene_renderer: &mut R,
        scene: &R::Scene,
        camera: &R::Camera,
        elapsed: f32,
    ) where
        R: SceneRenderer<C> + ?Sized,
    {
        if let Some(stage) = &self.stage {
            stage.render(
                &mut *self.ctx,
                target_width,
                target_height,
                scene_renderer,
                scene,
                camera,
                elapsed,
            );
        }
    }

    pub fn stage(&self) -> Option<&Postprocessor> {
        self.stage.as_ref()
    }

    pub fn context(&mut self) -> &mut C {
        &mut *self.ctx
    }
}

impl<C: GraphicsContext + ?Sized> Drop for StageGuard<'_, C> {
    fn drop(&mut self) {
        if let Some(stage) = self.stage.take() {
            stage.destroy(&mut *self.ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{GfxCall, RecordingContext};
    use crate::render::post::SceneFn;

    fn init(width: u32, height: u32) -> PostprocessorInit<'static> {
        PostprocessorInit {
            width,
            height,
            ..Default::default()
        }
    }

    fn noop_scene() -> SceneFn<impl FnMut(&mut RecordingContext, &(), &()), (), ()> {
        SceneFn::new(|_: &mut RecordingContext, _: &(), _: &()| {})
    }

    #[test]
    fn create_sizes_attachments_to_request() {
        let mut ctx = RecordingContext::new();
        let stage = Postprocessor::create(&mut ctx, &init(320, 200)).unwrap();

        assert_eq!(stage.size(), (320, 200));
        assert_eq!(ctx.texture_size(stage.color_texture()), Some((320, 200)));
        assert_eq!(ctx.renderbuffer_size(stage.renderbuffer), Some((320, 200)));
        assert!(ctx.calls().contains(&GfxCall::CreateTexture {
            id: stage.color_texture(),
            width: 320,
            height: 200,
            filter: TextureFilter::Nearest,
        }));
        assert_eq!(
            ctx.count(|c| matches!(c, GfxCall::CheckFramebufferStatus { .. })),
            1
        );
    }

    #[test]
    fn create_uploads_screen_quad_and_time_uniform() {
        let mut ctx = RecordingContext::new();
        let stage = Postprocessor::create(&mut ctx, &init(64, 64)).unwrap();

        let data = ctx.buffer_data(stage.vertex_buffer).unwrap();
        assert_eq!(data, bytemuck::cast_slice::<_, u8>(&SCREEN_QUAD));
        assert!(ctx.calls().contains(&GfxCall::CreateVertexArray {
            id: stage.vertex_array,
            buffer: stage.vertex_buffer,
            layout: QuadVertex::LAYOUT,
        }));
        assert!(ctx.calls().contains(&GfxCall::CreateProgram {
            id: Some(stage.program),
            uniforms: vec!["time".to_string()],
        }));
    }

    #[test]
    fn zero_size_is_rejected_without_calls() {
        let mut ctx = RecordingContext::new();
        let err = Postprocessor::create(&mut ctx, &init(0, 10)).unwrap_err();
        assert_eq!(err, SetupError::InvalidSize { width: 0, height: 10 });
        assert!(ctx.calls().is_empty());
    }

    #[test]
    fn incomplete_framebuffer_aborts_and_releases() {
        let mut ctx =
            RecordingContext::new().with_framebuffer_status(FramebufferStatus::MissingAttachment);
        let err = Postprocessor::create(&mut ctx, &init(32, 32)).unwrap_err();
        assert_eq!(
            err,
            SetupError::IncompleteFramebuffer(FramebufferStatus::MissingAttachment)
        );

        let deletes = ctx.count(|c| {
            matches!(
                c,
                GfxCall::DeleteRenderbuffer(_)
                    | GfxCall::DeleteTexture(_)
                    | GfxCall::DeleteFramebuffer(_)
            )
        });
        assert_eq!(deletes, 3);
        assert_eq!(ctx.count(|c| matches!(c, GfxCall::CreateVertexBuffer { .. })), 0);
        assert_eq!(ctx.count(|c| matches!(c, GfxCall::CreateProgram { .. })), 0);
    }

    #[test]
    fn shader_failure_releases_everything() {
        let mut ctx = RecordingContext::new().with_shader_error("expected `;`");
        let err = Postprocessor::create(&mut ctx, &init(32, 32)).unwrap_err();
        assert_eq!(err, SetupError::ShaderBuild("expected `;`".to_string()));

        let tail: Vec<_> = ctx.calls().iter().rev().take(5).rev().cloned().collect();
        assert!(matches!(
            tail.as_slice(),
            [
                GfxCall::DeleteVertexArray(_),
                GfxCall::DeleteBuffer(_),
                GfxCall::DeleteRenderbuffer(_),
                GfxCall::DeleteTexture(_),
                GfxCall::DeleteFramebuffer(_),
            ]
        ));
    }

    #[test]
    fn render_issues_fixed_two_pass_sequence() {
        let mut ctx = RecordingContext::new();
        let stage = Postprocessor::create(&mut ctx, &init(256, 128)).unwrap();
        ctx.take_calls();

        let mut scene = SceneFn::new(|ctx: &mut RecordingContext, _: &(), _: &()| {
            ctx.draw_triangles(0, 3);
        });
        stage.render(&mut ctx, 800, 600, &mut scene, &(), &(), 1.5);

        let expected = vec![
            GfxCall::Viewport { x: 0, y: 0, width: 256, height: 128 },
            GfxCall::BindFramebuffer(Some(stage.framebuffer())),
            GfxCall::ClearColor(ColorRgba::new(0.1, 0.1, 0.1, 1.0)),
            GfxCall::Clear(ClearMask::COLOR_DEPTH),
            GfxCall::DepthTest(true),
            GfxCall::DrawTriangles { first: 0, count: 3 },
            GfxCall::Viewport { x: 0, y: 0, width: 800, height: 600 },
            GfxCall::BindFramebuffer(None),
            GfxCall::ClearColor(ColorRgba::white()),
            GfxCall::Clear(ClearMask::COLOR),
            GfxCall::UseProgram(stage.program),
            GfxCall::BindVertexArray(stage.vertex_array),
            GfxCall::DepthTest(false),
            GfxCall::BindTexture { unit: 0, texture: stage.color_texture() },
            GfxCall::UniformF32 {
                program: stage.program,
                name: "time".to_string(),
                value: 1.5,
            },
            GfxCall::DrawTriangles { first: 0, count: 6 },
        ];
        assert_eq!(ctx.calls(), expected.as_slice());
    }

    #[test]
    fn render_clears_twice_and_draws_quad_once_regardless_of_scene() {
        let mut ctx = RecordingContext::new();
        let stage = Postprocessor::create(&mut ctx, &init(16, 16)).unwrap();

        for frame in 0..3u32 {
            ctx.take_calls();
            let mut scene = SceneFn::new(|ctx: &mut RecordingContext, n: &u32, _: &()| {
                for _ in 0..*n {
                    ctx.draw_triangles(0, 3);
                }
            });
            stage.render(&mut ctx, 16, 16, &mut scene, &frame, &(), frame as f32);

            assert_eq!(ctx.count(|c| matches!(c, GfxCall::Clear(_))), 2);
            assert_eq!(
                ctx.count(|c| matches!(c, GfxCall::DrawTriangles { count: 6, .. })),
                1
            );
        }
    }

    #[test]
    fn scene_sees_offscreen_target() {
        let mut ctx = RecordingContext::new();
        let stage = Postprocessor::create(&mut ctx, &init(16, 16)).unwrap();
        ctx.take_calls();

        let mut seen = 0;
        let mut scene = SceneFn::new(|ctx: &mut RecordingContext, _: &(), _: &()| {
            seen = ctx.calls().len();
        });
        stage.render(&mut ctx, 16, 16, &mut scene, &(), &(), 0.0);

        assert_eq!(seen, 5);
        assert_eq!(ctx.calls()[1], GfxCall::BindFramebuffer(Some(stage.framebuffer())));
    }

    #[test]
    fn destroy_releases_in_reverse_order() {
        let mut ctx = RecordingContext::new();
        let stage = Postprocessor::create(&mut ctx, &init(8, 8)).unwrap();
        let (fb, tex, rb, vbo, vao, prog) = (
            stage.framebuffer,
            stage.texture,
            stage.renderbuffer,
            stage.vertex_buffer,
            stage.vertex_array,
            stage.program,
        );
        ctx.take_calls();

        stage.destroy(&mut ctx);
        assert_eq!(
            ctx.calls(),
            &[
                GfxCall::DeleteProgram(prog),
                GfxCall::DeleteVertexArray(vao),
                GfxCall::DeleteBuffer(vbo),
                GfxCall::DeleteRenderbuffer(rb),
                GfxCall::DeleteTexture(tex),
                GfxCall::DeleteFramebuffer(fb),
            ]
        );
        assert_eq!(ctx.texture_size(tex), None);
    }

    #[test]
    fn guard_renders_and_destroys_on_drop() {
        let mut ctx = RecordingContext::new();
        {
            let mut guard = Postprocessor::scoped(&mut ctx, &init(8, 8)).unwrap();
            assert!(guard.stage().is_some());
            guard.render(8, 8, &mut noop_scene(), &(), &(), 0.25);
        }

        assert_eq!(ctx.count(|c| matches!(c, GfxCall::DrawTriangles { count: 6, .. })), 1);
        assert_eq!(ctx.count(|c| matches!(c, GfxCall::DeleteFramebuffer(_))), 1);
        assert!(matches!(ctx.calls().last(), Some(GfxCall::DeleteFramebuffer(_))));
    }

    #[test]
    fn setup_error_messages() {
        assert_eq!(
            SetupError::InvalidSize { width: 0, height: 4 }.to_string(),
            "invalid offscreen size 0x4"
        );
        assert!(SetupError::ShaderBuild("boom".into()).to_string().ends_with("boom"));
    }
}
