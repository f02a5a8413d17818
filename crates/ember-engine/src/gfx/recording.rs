use std::collections::HashMap;

use super::color::ColorRgba;
use super::context::{
    ClearMask, FramebufferStatus, GraphicsContext, ProgramSource, TextureFilter, VertexLayout,
};
use super::ids::{BufferId, FramebufferId, ProgramId, RenderbufferId, TextureId, VertexArrayId};

/// One recorded [`GraphicsContext`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum GfxCall {
    CreateTexture { id: TextureId, width: u32, height: u32, filter: TextureFilter },
    CreateRenderbuffer { id: RenderbufferId, width: u32, height: u32 },
    CreateFramebuffer { id: FramebufferId },
    FramebufferTexture { framebuffer: FramebufferId, texture: TextureId },
    FramebufferRenderbuffer { framebuffer: FramebufferId, renderbuffer: RenderbufferId },
    CheckFramebufferStatus { framebuffer: FramebufferId, status: FramebufferStatus },
    CreateVertexBuffer { id: BufferId, len: usize },
    CreateVertexArray { id: VertexArrayId, buffer: BufferId, layout: VertexLayout },
    CreateProgram { id: Option<ProgramId>, uniforms: Vec<String> },
    Viewport { x: i32, y: i32, width: u32, height: u32 },
    BindFramebuffer(Option<FramebufferId>),
    ClearColor(ColorRgba),
    Clear(ClearMask),
    DepthTest(bool),
    UseProgram(ProgramId),
    BindVertexArray(VertexArrayId),
    BindTexture { unit: u32, texture: TextureId },
    UniformF32 { program: ProgramId, name: String, value: f32 },
    DrawTriangles { first: u32, count: u32 },
    DeleteProgram(ProgramId),
    DeleteVertexArray(VertexArrayId),
    DeleteBuffer(BufferId),
    DeleteRenderbuffer(RenderbufferId),
    DeleteTexture(TextureId),
    DeleteFramebuffer(FramebufferId),
}

#[derive(Debug, Default, Clone, Copy)]
struct FramebufferAttachments {
    color: Option<TextureId>,
    depth: Option<RenderbufferId>,
}

/// [`GraphicsContext`] that executes nothing and records every call.
///
/// Ids are allocated from one counter starting at 1. Framebuffer completeness
/// is derived from attachments unless forced with
/// [`with_framebuffer_status`](Self::with_framebuffer_status).
#[derive(Debug, Default)]
pub struct RecordingContext {
    calls: Vec<GfxCall>,
    next_id: u32,

    forced_status: Option<FramebufferStatus>,
    shader_error: Option<String>,

    sizes: HashMap<u32, (u32, u32)>,
    framebuffers: HashMap<FramebufferId, FramebufferAttachments>,
    buffers: HashMap<BufferId, Vec<u8>>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces every completeness query to return `status`.
    pub fn with_framebuffer_status(mut self, status: FramebufferStatus) -> Self {
        self.forced_status = Some(status);
        self
    }

    /// Makes every `create_program` call fail with `message`.
    pub fn with_shader_error(mut self, message: impl Into<String>) -> Self {
        self.shader_error = Some(message.into());
        self
    }

    pub fn calls(&self) -> &[GfxCall] {
        &self.calls
    }

    /// Returns and forgets the recorded calls.
    pub fn take_calls(&mut self) -> Vec<GfxCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn count(&self, pred: impl Fn(&GfxCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Size of a live texture.
    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.sizes.get(&id.raw()).copied()
    }

    /// Size of a live renderbuffer.
    pub fn renderbuffer_size(&self, id: RenderbufferId) -> Option<(u32, u32)> {
        self.sizes.get(&id.raw()).copied()
    }

    /// Contents of a live vertex buffer.
    pub fn buffer_data(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(Vec::as_slice)
    }

    fn alloc(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn derived_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        let Some(att) = self.framebuffers.get(&framebuffer) else {
            return FramebufferStatus::Undefined;
        };
        let Some(color) = att.color else {
            return FramebufferStatus::MissingAttachment;
        };
        let color_size = self.sizes.get(&color.raw());
        let depth_size = att.depth.and_then(|d| self.sizes.get(&d.raw()));
        match (color_size, depth_size) {
            (Some(c), Some(d)) if c != d => FramebufferStatus::IncompleteDimensions,
            (Some(_), _) => FramebufferStatus::Complete,
            (None, _) => FramebufferStatus::MissingAttachment,
        }
    }
}

impl GraphicsContext for RecordingContext {
    fn create_texture(&mut self, width: u32, height: u32, filter: TextureFilter) -> TextureId {
        let id = TextureId::from_raw(self.alloc());
        self.sizes.insert(id.raw(), (width, height));
        self.calls.push(GfxCall::CreateTexture { id, width, height, filter });
        id
    }

    fn create_renderbuffer(&mut self, width: u32, height: u32) -> RenderbufferId {
        let id = RenderbufferId::from_raw(self.alloc());
        self.sizes.insert(id.raw(), (width, height));
        self.calls.push(GfxCall::CreateRenderbuffer { id, width, height });
        id
    }

    fn create_framebuffer(&mut self) -> FramebufferId {
        let id = FramebufferId::from_raw(self.alloc());
        self.framebuffers.insert(id, FramebufferAttachments::default());
        self.calls.push(GfxCall::CreateFramebuffer { id });
        id
    }

    fn framebuffer_texture(&mut self, framebuffer: FramebufferId, texture: TextureId) {
        if let Some(att) = self.framebuffers.get_mut(&framebuffer) {
            att.color = Some(texture);
        }
        self.calls.push(GfxCall::FramebufferTexture { framebuffer, texture });
    }

    fn framebuffer_renderbuffer(
        &mut self,
        framebuffer: FramebufferId,
        renderbuffer: RenderbufferId,
    ) {
        if let Some(att) = self.framebuffers.get_mut(&framebuffer) {
            att.depth = Some(renderbuffer);
        }
        self.calls.push(GfxCall::FramebufferRenderbuffer { framebuffer, renderbuffer });
    }

    fn check_framebuffer_status(&mut self, framebuffer: FramebufferId) -> FramebufferStatus {
        let status = self
            .forced_status
            .unwrap_or_else(|| self.derived_status(framebuffer));
        self.calls.push(GfxCall::CheckFramebufferStatus { framebuffer, status });
        status
    }

    fn create_vertex_buffer(&mut self, data: &[u8]) -> BufferId {
        let id = BufferId::from_raw(self.alloc());
        self.buffers.insert(id, data.to_vec());
        self.calls.push(GfxCall::CreateVertexBuffer { id, len: data.len() });
        id
    }

    fn create_vertex_array(&mut self, buffer: BufferId, layout: VertexLayout) -> VertexArrayId {
        let id = VertexArrayId::from_raw(self.alloc());
        self.calls.push(GfxCall::CreateVertexArray { id, buffer, layout });
        id
    }

    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId, String> {
        let uniforms = source.uniforms.iter().map(|s| s.to_string()).collect();
        if let Some(err) = self.shader_error.clone() {
            self.calls.push(GfxCall::CreateProgram { id: None, uniforms });
            return Err(err);
        }
        let id = ProgramId::from_raw(self.alloc());
        self.calls.push(GfxCall::CreateProgram { id: Some(id), uniforms });
        Ok(id)
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.calls.push(GfxCall::Viewport { x, y, width, height });
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.calls.push(GfxCall::BindFramebuffer(framebuffer));
    }

    fn clear_color(&mut self, color: ColorRgba) {
        self.calls.push(GfxCall::ClearColor(color));
    }

    fn clear(&mut self, mask: ClearMask) {
        self.calls.push(GfxCall::Clear(mask));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(GfxCall::DepthTest(enabled));
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(GfxCall::UseProgram(program));
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.calls.push(GfxCall::BindVertexArray(vertex_array));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.calls.push(GfxCall::BindTexture { unit, texture });
    }

    fn uniform_f32(&mut self, program: ProgramId, name: &str, value: f32) {
        self.calls.push(GfxCall::UniformF32 {
            program,
            name: name.to_string(),
            value,
        });
    }

    fn draw_triangles(&mut self, first: u32, count: u32) {
        self.calls.push(GfxCall::DrawTriangles { first, count });
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.calls.push(GfxCall::DeleteProgram(program));
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.calls.push(GfxCall::DeleteVertexArray(vertex_array));
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.calls.push(GfxCall::DeleteBuffer(buffer));
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        self.sizes.remove(&renderbuffer.raw());
        self.calls.push(GfxCall::DeleteRenderbuffer(renderbuffer));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.sizes.remove(&texture.raw());
        self.calls.push(GfxCall::DeleteTexture(texture));
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.framebuffers.remove(&framebuffer);
        self.calls.push(GfxCall::DeleteFramebuffer(framebuffer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_follows_attachments() {
        let mut ctx = RecordingContext::new();
        let fb = ctx.create_framebuffer();
        assert_eq!(ctx.check_framebuffer_status(fb), FramebufferStatus::MissingAttachment);

        let tex = ctx.create_texture(64, 32, TextureFilter::Nearest);
        ctx.framebuffer_texture(fb, tex);
        assert_eq!(ctx.check_framebuffer_status(fb), FramebufferStatus::Complete);

        let rb = ctx.create_renderbuffer(64, 64);
        ctx.framebuffer_renderbuffer(fb, rb);
        assert_eq!(
            ctx.check_framebuffer_status(fb),
            FramebufferStatus::IncompleteDimensions
        );

        ctx.delete_framebuffer(fb);
        assert_eq!(ctx.check_framebuffer_status(fb), FramebufferStatus::Undefined);
    }

    #[test]
    fn forced_status_wins() {
        let mut ctx = RecordingContext::new().with_framebuffer_status(FramebufferStatus::Undefined);
        let fb = ctx.create_framebuffer();
        let tex = ctx.create_texture(4, 4, TextureFilter::Linear);
        ctx.framebuffer_texture(fb, tex);
        assert_eq!(ctx.check_framebuffer_status(fb), FramebufferStatus::Undefined);
    }

    #[test]
    fn ids_are_unique_across_kinds() {
        let mut ctx = RecordingContext::new();
        let t = ctx.create_texture(1, 1, TextureFilter::Nearest);
        let r = ctx.create_renderbuffer(1, 1);
        let b = ctx.create_vertex_buffer(&[1, 2, 3]);
        assert_ne!(t.raw(), r.raw());
        assert_ne!(r.raw(), b.raw());
        assert_eq!(ctx.buffer_data(b), Some(&[1u8, 2, 3][..]));
        assert_eq!(ctx.calls().len(), 3);
    }

    #[test]
    fn shader_error_is_reported() {
        let mut ctx = RecordingContext::new().with_shader_error("bad wgsl");
        let src = ProgramSource {
            vertex: "",
            fragment: "",
            uniforms: &["time"],
        };
        assert_eq!(ctx.create_program(&src), Err("bad wgsl".to_string()));
        assert_eq!(
            ctx.take_calls(),
            vec![GfxCall::CreateProgram {
                id: None,
                uniforms: vec!["time".to_string()]
            }]
        );
        assert!(ctx.calls().is_empty());
    }
}
