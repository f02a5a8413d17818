//! Graphics context abstraction.
//!
//! A small GL-style command surface (resource ids, bind state, clears, draws)
//! that engine stages are written against. Backends:
//! - [`WgpuContext`]: records passes into a wgpu command encoder
//! - [`RecordingContext`]: records calls for inspection in tests and tools

mod color;
mod context;
mod ids;
mod recording;
mod wgpu_backend;

pub use color::ColorRgba;
pub use context::{
    ClearMask, FramebufferStatus, GraphicsContext, ProgramSource, TextureFilter, VertexAttribute,
    VertexLayout,
};
pub use ids::{BufferId, FramebufferId, ProgramId, RenderbufferId, TextureId, VertexArrayId};
pub use recording::{GfxCall, RecordingContext};
pub use wgpu_backend::WgpuContext;
