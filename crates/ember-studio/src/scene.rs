use bytemuck::{Pod, Zeroable};
use ember_engine::gfx::{
    BufferId, GraphicsContext, ProgramId, ProgramSource, VertexArrayId, VertexAttribute,
    VertexLayout,
};
use ember_engine::render::post::SceneRenderer;

const TRIANGLE_WGSL: &str = include_str!("shaders/triangle.wgsl");

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ColorVertex {
    position: [f32; 3],
    color: [f32; 4],
}

const COLOR_VERTEX_LAYOUT: VertexLayout = VertexLayout {
    stride: std::mem::size_of::<ColorVertex>() as u32,
    attributes: &[
        VertexAttribute { location: 0, components: 3, offset: 0 },
        VertexAttribute { location: 1, components: 4, offset: 12 },
    ],
};

/// What the demo draws.
#[derive(Debug, Clone)]
pub struct Scene {
    pub vertices: [([f32; 3], [f32; 4]); 3],
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            vertices: [
                ([0.0, 0.6, 0.5], [0.95, 0.35, 0.2, 1.0]),
                ([-0.55, -0.45, 0.5], [0.2, 0.8, 0.4, 1.0]),
                ([0.55, -0.45, 0.5], [0.25, 0.4, 0.95, 1.0]),
            ],
        }
    }
}

/// View parameters: rotation of the scene around the view axis.
#[derive(Debug, Copy, Clone, Default)]
pub struct Camera {
    pub angle: f32,
}

/// Draws [`Scene`] through any [`GraphicsContext`].
///
/// GPU resources are created on first use and kept until [`destroy`](Self::destroy).
#[derive(Debug, Default)]
pub struct TriangleRenderer {
    resources: Option<Resources>,
    failed: bool,
}

#[derive(Debug)]
struct Resources {
    program: ProgramId,
    vertex_array: VertexArrayId,
    vertex_buffer: BufferId,
}

impl TriangleRenderer {
    fn ensure<C: GraphicsContext + ?Sized>(
        &mut self,
        ctx: &mut C,
        scene: &Scene,
    ) -> Option<&Resources> {
        if self.resources.is_none() && !self.failed {
            let source = ProgramSource {
                vertex: TRIANGLE_WGSL,
                fragment: TRIANGLE_WGSL,
                uniforms: &["angle"],
            };
            match ctx.create_program(&source) {
                Ok(program) => {
                    let vertices = scene
                        .vertices
                        .map(|(position, color)| ColorVertex { position, color });
                    let vertex_buffer = ctx.create_vertex_buffer(bytemuck::cast_slice(&vertices));
                    let vertex_array = ctx.create_vertex_array(vertex_buffer, COLOR_VERTEX_LAYOUT);
                    self.resources = Some(Resources {
                        program,
                        vertex_array,
                        vertex_buffer,
                    });
                }
                Err(msg) => {
                    log::error!("triangle program failed: {msg}");
                    self.failed = true;
                }
            }
        }
        self.resources.as_ref()
    }

    pub fn destroy<C: GraphicsContext + ?Sized>(&mut self, ctx: &mut C) {
        if let Some(res) = self.resources.take() {
            ctx.delete_program(res.program);
            ctx.delete_vertex_array(res.vertex_array);
            ctx.delete_buffer(res.vertex_buffer);
        }
    }
}

impl<C: GraphicsContext + ?Sized> SceneRenderer<C> for TriangleRenderer {
    type Scene = Scene;
    type Camera = Camera;

    fn render_scene(&mut self, ctx: &mut C, scene: &Scene, camera: &Camera) {
        let Some(res) = self.ensure(ctx, scene) else {
            return;
        };
        let (program, vertex_array) = (res.program, res.vertex_array);

        ctx.use_program(program);
        ctx.bind_vertex_array(vertex_array);
        ctx.uniform_f32(program, "angle", camera.angle);
        ctx.draw_triangles(0, 3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_engine::gfx::{GfxCall, RecordingContext};

    #[test]
    fn resources_are_created_once() {
        let mut ctx = RecordingContext::new();
        let mut renderer = TriangleRenderer::default();
        let scene = Scene::default();

        renderer.render_scene(&mut ctx, &scene, &Camera::default());
        renderer.render_scene(&mut ctx, &scene, &Camera { angle: 1.0 });

        assert_eq!(ctx.count(|c| matches!(c, GfxCall::CreateProgram { .. })), 1);
        assert_eq!(ctx.count(|c| matches!(c, GfxCall::DrawTriangles { count: 3, .. })), 2);

        renderer.destroy(&mut ctx);
        assert_eq!(ctx.count(|c| matches!(c, GfxCall::DeleteProgram(_))), 1);
    }

    #[test]
    fn failed_program_is_not_retried() {
        let mut ctx = RecordingContext::new().with_shader_error("nope");
        let mut renderer = TriangleRenderer::default();
        let scene = Scene::default();

        renderer.render_scene(&mut ctx, &scene, &Camera::default());
        renderer.render_scene(&mut ctx, &scene, &Camera::default());

        assert_eq!(ctx.count(|c| matches!(c, GfxCall::CreateProgram { .. })), 1);
        assert_eq!(ctx.count(|c| matches!(c, GfxCall::DrawTriangles { .. })), 0);
    }
}
