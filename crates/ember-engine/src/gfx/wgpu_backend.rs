use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::color::ColorRgba;
use super::context::{
    ClearMask, FramebufferStatus, GraphicsContext, ProgramSource, TextureFilter, VertexLayout,
};
use super::ids::{BufferId, FramebufferId, ProgramId, RenderbufferId, TextureId, VertexArrayId};

/// Color format of textures created through the context.
const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Minimum uniform block size; WGSL structs round up to 16 bytes.
const UNIFORM_ALIGN: u64 = 16;

/// [`GraphicsContext`] on top of wgpu.
///
/// Program contract (WGSL):
/// - vertex entry point `vs_main`, fragment entry point `fs_main`
/// - `@group(0) @binding(0)`: uniform struct holding the declared scalars in order
/// - `@group(0) @binding(1)`: `texture_2d<f32>` bound with `bind_texture(0, ..)`
/// - `@group(0) @binding(2)`: `sampler` of that texture
///
/// Clears and draws are recorded between [`begin_frame`](Self::begin_frame) and
/// [`finish_frame`](Self::finish_frame); the default framebuffer is the view
/// passed to `begin_frame`. Each clear or draw records its own render pass.
/// Uniform writes go through the queue and apply to the whole frame, so the
/// last value set before submission wins.
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    next_id: u32,

    textures: HashMap<TextureId, GpuTexture>,
    renderbuffers: HashMap<RenderbufferId, GpuRenderbuffer>,
    framebuffers: HashMap<FramebufferId, GpuFramebuffer>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    vertex_arrays: HashMap<VertexArrayId, GpuVertexArray>,
    programs: HashMap<ProgramId, GpuProgram>,

    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    fallback: GpuTexture,

    frame: Option<FrameTarget>,
    state: BindState,
}

struct GpuTexture {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    size: (u32, u32),
}

struct GpuRenderbuffer {
    view: wgpu::TextureView,
    size: (u32, u32),
}

#[derive(Default)]
struct GpuFramebuffer {
    color: Option<TextureId>,
    depth: Option<RenderbufferId>,
}

struct GpuVertexArray {
    buffer: BufferId,
    layout: VertexLayout,
}

struct GpuProgram {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    uniforms: Vec<String>,
    values: Vec<f32>,
    ubo: wgpu::Buffer,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    depth_test: bool,
    layout: VertexLayout,
}

struct FrameTarget {
    encoder: wgpu::CommandEncoder,
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    size: (u32, u32),
}

#[derive(Default)]
struct BindState {
    framebuffer: Option<FramebufferId>,
    viewport: Option<(i32, i32, u32, u32)>,
    clear_color: ColorRgba,
    depth_test: bool,
    program: Option<ProgramId>,
    vertex_array: Option<VertexArrayId>,
    texture: Option<TextureId>,
}

/// Attachments of the currently bound target.
struct Target<'a> {
    color: &'a wgpu::TextureView,
    color_format: wgpu::TextureFormat,
    depth: Option<&'a wgpu::TextureView>,
    size: (u32, u32),
}

impl WgpuContext {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ember gfx bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ember gfx pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        // Bound when a program samples without a texture.
        let fallback = new_texture(device, 1, 1, TextureFilter::Nearest, "ember gfx fallback");
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &fallback.0,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255, 255, 255, 255],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
        );

        Self {
            device: device.clone(),
            queue: queue.clone(),
            next_id: 0,
            textures: HashMap::new(),
            renderbuffers: HashMap::new(),
            framebuffers: HashMap::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            programs: HashMap::new(),
            bind_group_layout,
            pipeline_layout,
            fallback: fallback.1,
            frame: None,
            state: BindState::default(),
        }
    }

    /// Starts recording a frame whose default framebuffer is `view`.
    ///
    /// An unfinished previous frame is discarded.
    pub fn begin_frame(
        &mut self,
        view: wgpu::TextureView,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) {
        if self.frame.is_some() {
            log::warn!("begin_frame called with a frame in flight; discarding it");
        }
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ember gfx frame encoder"),
            });
        self.frame = Some(FrameTarget {
            encoder,
            view,
            format,
            size: (width.max(1), height.max(1)),
        });
    }

    /// Ends the frame and returns its commands for submission.
    pub fn finish_frame(&mut self) -> Option<wgpu::CommandBuffer> {
        self.frame.take().map(|f| f.encoder.finish())
    }

    fn alloc(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Intersects a viewport with a `size` target. `None` means full target; the
/// result is `None` when nothing of the viewport is left.
fn clamped_viewport(
    viewport: Option<(i32, i32, u32, u32)>,
    size: (u32, u32),
) -> Option<(f32, f32, f32, f32)> {
    let (x, y, w, h) = viewport.unwrap_or((0, 0, size.0, size.1));
    let x0 = (x.max(0) as u32).min(size.0);
    let y0 = (y.max(0) as u32).min(size.1);
    let x1 = (x as i64 + w as i64).clamp(0, size.0 as i64) as u32;
    let y1 = (y as i64 + h as i64).clamp(0, size.1 as i64) as u32;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as f32, y0 as f32, (x1 - x0) as f32, (y1 - y0) as f32))
}

/// Completeness from attachment sizes. An inner `None` is an attachment id
/// that no longer resolves.
fn attachment_status(
    color: Option<(u32, u32)>,
    depth: Option<Option<(u32, u32)>>,
) -> FramebufferStatus {
    let Some(color) = color else {
        return FramebufferStatus::MissingAttachment;
    };
    match depth {
        None => FramebufferStatus::Complete,
        Some(None) => FramebufferStatus::MissingAttachment,
        Some(Some(depth)) if depth != color => FramebufferStatus::IncompleteDimensions,
        Some(Some(_)) => FramebufferStatus::Complete,
    }
}

fn new_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    filter: TextureFilter,
    label: &str,
) -> (wgpu::Texture, GpuTexture) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let filter_mode = match filter {
        TextureFilter::Nearest => wgpu::FilterMode::Nearest,
        TextureFilter::Linear => wgpu::FilterMode::Linear,
    };
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter_mode,
        min_filter: filter_mode,
        ..Default::default()
    });

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, GpuTexture { view, sampler, size: (width, height) })
}

/// Resolves the bound framebuffer (or the frame's default target).
fn resolve_target<'a>(
    bound: Option<FramebufferId>,
    frame: &'a FrameTarget,
    framebuffers: &HashMap<FramebufferId, GpuFramebuffer>,
    textures: &'a HashMap<TextureId, GpuTexture>,
    renderbuffers: &'a HashMap<RenderbufferId, GpuRenderbuffer>,
) -> Option<Target<'a>> {
    let Some(id) = bound else {
        return Some(Target {
            color: &frame.view,
            color_format: frame.format,
            depth: None,
            size: frame.size,
        });
    };

    let fb = framebuffers.get(&id)?;
    let color = textures.get(&fb.color?)?;
    let depth = fb.depth.and_then(|d| renderbuffers.get(&d));
    Some(Target {
        color: &color.view,
        color_format: COLOR_FORMAT,
        depth: depth.map(|d| &d.view),
        size: color.size,
    })
}

fn build_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    program: &GpuProgram,
    key: PipelineKey,
) -> wgpu::RenderPipeline {
    let attributes: Vec<wgpu::VertexAttribute> = key
        .layout
        .attributes
        .iter()
        .map(|a| wgpu::VertexAttribute {
            format: match a.components {
                1 => wgpu::VertexFormat::Float32,
                2 => wgpu::VertexFormat::Float32x2,
                3 => wgpu::VertexFormat::Float32x3,
                _ => wgpu::VertexFormat::Float32x4,
            },
            offset: a.offset as u64,
            shader_location: a.location,
        })
        .collect();

    let depth_stencil = key.depth_format.map(|format| wgpu::DepthStencilState {
        format,
        depth_write_enabled: key.depth_test,
        depth_compare: if key.depth_test {
            wgpu::CompareFunction::Less
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("ember gfx pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &program.vertex,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: key.layout.stride as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: &program.fragment,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.color_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

impl GraphicsContext for WgpuContext {
    fn create_texture(&mut self, width: u32, height: u32, filter: TextureFilter) -> TextureId {
        let id = TextureId::from_raw(self.alloc());
        let (_, texture) = new_texture(&self.device, width, height, filter, "ember gfx texture");
        self.textures.insert(id, texture);
        id
    }

    fn create_renderbuffer(&mut self, width: u32, height: u32) -> RenderbufferId {
        let id = RenderbufferId::from_raw(self.alloc());
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ember gfx renderbuffer"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_STENCIL_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.renderbuffers.insert(id, GpuRenderbuffer { view, size: (width, height) });
        id
    }

    fn create_framebuffer(&mut self) -> FramebufferId {
        let id = FramebufferId::from_raw(self.alloc());
        self.framebuffers.insert(id, GpuFramebuffer::default());
        id
    }

    fn framebuffer_texture(&mut self, framebuffer: FramebufferId, texture: TextureId) {
        match self.framebuffers.get_mut(&framebuffer) {
            Some(fb) => fb.color = Some(texture),
            None => log::warn!("framebuffer_texture: unknown framebuffer {framebuffer:?}"),
        }
    }

    fn framebuffer_renderbuffer(
        &mut self,
        framebuffer: FramebufferId,
        renderbuffer: RenderbufferId,
    ) {
        match self.framebuffers.get_mut(&framebuffer) {
            Some(fb) => fb.depth = Some(renderbuffer),
            None => log::warn!("framebuffer_renderbuffer: unknown framebuffer {framebuffer:?}"),
        }
    }

    fn check_framebuffer_status(&mut self, framebuffer: FramebufferId) -> FramebufferStatus {
        let Some(fb) = self.framebuffers.get(&framebuffer) else {
            return FramebufferStatus::Undefined;
        };
        let color = fb.color.and_then(|c| self.textures.get(&c)).map(|t| t.size);
        let depth = fb.depth.map(|d| self.renderbuffers.get(&d).map(|rb| rb.size));
        attachment_status(color, depth)
    }

    fn create_vertex_buffer(&mut self, data: &[u8]) -> BufferId {
        let id = BufferId::from_raw(self.alloc());
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ember gfx vertex buffer"),
            contents: data,
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.buffers.insert(id, buffer);
        id
    }

    fn create_vertex_array(&mut self, buffer: BufferId, layout: VertexLayout) -> VertexArrayId {
        let id = VertexArrayId::from_raw(self.alloc());
        self.vertex_arrays.insert(id, GpuVertexArray { buffer, layout });
        id
    }

    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId, String> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ember gfx vertex shader"),
            source: wgpu::ShaderSource::Wgsl(source.vertex.into()),
        });
        let fragment = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ember gfx fragment shader"),
            source: wgpu::ShaderSource::Wgsl(source.fragment.into()),
        });
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(err.to_string());
        }

        let ubo_size = ((source.uniforms.len() as u64 * 4).div_ceil(UNIFORM_ALIGN) * UNIFORM_ALIGN)
            .max(UNIFORM_ALIGN);
        let ubo = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ember gfx program ubo"),
            size: ubo_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let id = ProgramId::from_raw(self.alloc());
        self.programs.insert(
            id,
            GpuProgram {
                vertex,
                fragment,
                uniforms: source.uniforms.iter().map(|s| s.to_string()).collect(),
                values: vec![0.0; (ubo_size / 4) as usize],
                ubo,
                pipelines: HashMap::new(),
            },
        );
        Ok(id)
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.state.viewport = Some((x, y, width, height));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.state.framebuffer = framebuffer;
    }

    fn clear_color(&mut self, color: ColorRgba) {
        self.state.clear_color = color;
    }

    fn clear(&mut self, mask: ClearMask) {
        let Some(frame) = self.frame.as_ref() else {
            log::warn!("clear outside of a frame; ignored");
            return;
        };
        let Some(target) = resolve_target(
            self.state.framebuffer,
            frame,
            &self.framebuffers,
            &self.textures,
            &self.renderbuffers,
        ) else {
            log::warn!("clear: bound framebuffer is incomplete; ignored");
            return;
        };
        let color_view = target.color.clone();
        let depth_view = target.depth.cloned();

        let color_load = if mask.color {
            wgpu::LoadOp::Clear(self.state.clear_color.into())
        } else {
            wgpu::LoadOp::Load
        };
        let depth_load = if mask.depth {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        };

        let Some(frame) = self.frame.as_mut() else {
            return;
        };

        let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ember gfx clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth_view.as_ref().map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.state.depth_test = enabled;
    }

    fn use_program(&mut self, program: ProgramId) {
        self.state.program = Some(program);
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.state.vertex_array = Some(vertex_array);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        if unit != 0 {
            log::warn!("bind_texture: only unit 0 is supported, got {unit}");
            return;
        }
        self.state.texture = Some(texture);
    }

    fn uniform_f32(&mut self, program: ProgramId, name: &str, value: f32) {
        let Some(p) = self.programs.get_mut(&program) else {
            log::warn!("uniform_f32: unknown program {program:?}");
            return;
        };
        let Some(index) = p.uniforms.iter().position(|u| u == name) else {
            log::warn!("uniform_f32: program {program:?} declares no uniform `{name}`");
            return;
        };
        p.values[index] = value;
        self.queue.write_buffer(&p.ubo, 0, bytemuck::cast_slice(&p.values));
    }

    fn draw_triangles(&mut self, first: u32, count: u32) {
        let (Some(program_id), Some(vao_id)) = (self.state.program, self.state.vertex_array) else {
            log::warn!("draw_triangles without program or vertex array; ignored");
            return;
        };
        let Some(frame) = self.frame.as_ref() else {
            log::warn!("draw_triangles outside of a frame; ignored");
            return;
        };
        let Some(target) = resolve_target(
            self.state.framebuffer,
            frame,
            &self.framebuffers,
            &self.textures,
            &self.renderbuffers,
        ) else {
            log::warn!("draw_triangles: bound framebuffer is incomplete; ignored");
            return;
        };
        let Some(viewport) = clamped_viewport(self.state.viewport, target.size) else {
            return;
        };
        let Some(vao) = self.vertex_arrays.get(&vao_id) else {
            log::warn!("draw_triangles: unknown vertex array {vao_id:?}");
            return;
        };
        let Some(vbo) = self.buffers.get(&vao.buffer) else {
            log::warn!("draw_triangles: vertex array {vao_id:?} has no live buffer");
            return;
        };
        let Some(program) = self.programs.get_mut(&program_id) else {
            log::warn!("draw_triangles: unknown program {program_id:?}");
            return;
        };

        let key = PipelineKey {
            color_format: target.color_format,
            depth_format: target.depth.map(|_| DEPTH_STENCIL_FORMAT),
            depth_test: self.state.depth_test,
            layout: vao.layout,
        };
        if !program.pipelines.contains_key(&key) {
            let pipeline = build_pipeline(&self.device, &self.pipeline_layout, program, key);
            program.pipelines.insert(key, pipeline);
        }
        let Some(pipeline) = program.pipelines.get(&key) else {
            return;
        };

        let sampled = self
            .state
            .texture
            .and_then(|t| self.textures.get(&t))
            .unwrap_or(&self.fallback);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ember gfx bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: program.ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&sampled.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampled.sampler),
                },
            ],
        });

        let color_view = target.color.clone();
        let depth_view = target.depth.cloned();
        let Some(frame) = self.frame.as_mut() else {
            return;
        };

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ember gfx draw"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth_view.as_ref().map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let (vx, vy, vw, vh) = viewport;
        rpass.set_viewport(vx, vy, vw, vh, 0.0, 1.0);
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));
        rpass.draw(first..first + count, 0..1);
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() {
            log::warn!("delete_program: unknown program {program:?}");
        }
        if self.state.program == Some(program) {
            self.state.program = None;
        }
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays.remove(&vertex_array);
        if self.state.vertex_array == Some(vertex_array) {
            self.state.vertex_array = None;
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(b) = self.buffers.remove(&buffer) {
            b.destroy();
        }
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        self.renderbuffers.remove(&renderbuffer);
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        if self.state.texture == Some(texture) {
            self.state.texture = None;
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.framebuffers.remove(&framebuffer);
        if self.state.framebuffer == Some(framebuffer) {
            self.state.framebuffer = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_viewport_covers_the_target() {
        assert_eq!(clamped_viewport(None, (640, 480)), Some((0.0, 0.0, 640.0, 480.0)));
    }

    #[test]
    fn negative_origin_is_cut_at_zero() {
        let vp = clamped_viewport(Some((-10, -20, 100, 50)), (640, 480));
        assert_eq!(vp, Some((0.0, 0.0, 90.0, 30.0)));
    }

    #[test]
    fn oversize_viewport_is_cut_at_target_edge() {
        let vp = clamped_viewport(Some((600, 400, 1_000, 1_000)), (640, 480));
        assert_eq!(vp, Some((600.0, 400.0, 40.0, 80.0)));

        let vp = clamped_viewport(Some((-5, 0, u32::MAX, u32::MAX)), (64, 32));
        assert_eq!(vp, Some((0.0, 0.0, 64.0, 32.0)));
    }

    #[test]
    fn viewport_outside_target_is_empty() {
        assert_eq!(clamped_viewport(Some((640, 0, 10, 10)), (640, 480)), None);
        assert_eq!(clamped_viewport(Some((-50, -50, 50, 50)), (640, 480)), None);
        assert_eq!(clamped_viewport(Some((0, 0, 0, 10)), (640, 480)), None);
    }

    #[test]
    fn framebuffer_needs_a_color_attachment() {
        assert_eq!(attachment_status(None, None), FramebufferStatus::MissingAttachment);
        assert_eq!(attachment_status(Some((8, 8)), None), FramebufferStatus::Complete);
    }

    #[test]
    fn depth_attachment_must_resolve_and_match() {
        assert_eq!(
            attachment_status(Some((8, 8)), Some(None)),
            FramebufferStatus::MissingAttachment
        );
        assert_eq!(
            attachment_status(Some((8, 8)), Some(Some((8, 4)))),
            FramebufferStatus::IncompleteDimensions
        );
        assert_eq!(
            attachment_status(Some((8, 8)), Some(Some((8, 8)))),
            FramebufferStatus::Complete
        );
    }
}
