use super::color::ColorRgba;
use super::ids::{BufferId, FramebufferId, ProgramId, RenderbufferId, TextureId, VertexArrayId};

/// Texture sampling filter for minification and magnification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Result of a framebuffer completeness query.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    /// No color attachment.
    MissingAttachment,
    /// Attachments differ in size.
    IncompleteDimensions,
    /// The id does not name a live framebuffer.
    Undefined,
}

/// Buffers cleared by [`GraphicsContext::clear`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
}

impl ClearMask {
    pub const COLOR: Self = Self { color: true, depth: false };
    pub const COLOR_DEPTH: Self = Self { color: true, depth: true };
}

/// One float vertex attribute inside an interleaved buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    /// Number of f32 components (1..=4).
    pub components: u8,
    /// Byte offset inside a vertex.
    pub offset: u32,
}

/// Interleaved vertex layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    /// Bytes between consecutive vertices.
    pub stride: u32,
    pub attributes: &'static [VertexAttribute],
}

/// Shader sources and declared scalar uniforms of a program.
///
/// Uniform order defines the layout of the program's uniform block: uniform
/// `i` lives at byte offset `4 * i`.
#[derive(Debug, Copy, Clone)]
pub struct ProgramSource<'a> {
    pub vertex: &'a str,
    pub fragment: &'a str,
    pub uniforms: &'a [&'a str],
}

/// GL-style command surface used by engine stages.
///
/// Calls are issued in order on a single thread. State set by `bind_*`,
/// `viewport`, `clear_color`, `set_depth_test` and `use_program` persists until
/// changed. Failures after setup are reported by the backend (logs, debug
/// layers) and never returned.
pub trait GraphicsContext {
    /// Allocates an RGBA8 color texture with undefined contents.
    fn create_texture(&mut self, width: u32, height: u32, filter: TextureFilter) -> TextureId;

    /// Allocates a combined depth24/stencil8 renderbuffer.
    fn create_renderbuffer(&mut self, width: u32, height: u32) -> RenderbufferId;

    fn create_framebuffer(&mut self) -> FramebufferId;

    /// Attaches `texture` as the framebuffer's color attachment.
    fn framebuffer_texture(&mut self, framebuffer: FramebufferId, texture: TextureId);

    /// Attaches `renderbuffer` as the framebuffer's depth/stencil attachment.
    fn framebuffer_renderbuffer(
        &mut self,
        framebuffer: FramebufferId,
        renderbuffer: RenderbufferId,
    );

    fn check_framebuffer_status(&mut self, framebuffer: FramebufferId) -> FramebufferStatus;

    /// Uploads immutable vertex data.
    fn create_vertex_buffer(&mut self, data: &[u8]) -> BufferId;

    fn create_vertex_array(&mut self, buffer: BufferId, layout: VertexLayout) -> VertexArrayId;

    /// Compiles and links a program. Errors carry the backend's diagnostic.
    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId, String>;

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Binds a framebuffer as render target; `None` selects the default
    /// (screen) framebuffer.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    fn clear_color(&mut self, color: ColorRgba);

    fn clear(&mut self, mask: ClearMask);

    fn set_depth_test(&mut self, enabled: bool);

    fn use_program(&mut self, program: ProgramId);

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId);

    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Sets a declared scalar uniform of `program`.
    fn uniform_f32(&mut self, program: ProgramId, name: &str, value: f32);

    /// Draws `count` vertices as a triangle list with the current state.
    fn draw_triangles(&mut self, first: u32, count: u32);

    fn delete_program(&mut self, program: ProgramId);
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);
    fn delete_buffer(&mut self, buffer: BufferId);
    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId);
    fn delete_texture(&mut self, texture: TextureId);
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);
}
