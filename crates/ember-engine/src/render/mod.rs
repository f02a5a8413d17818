//! Rendering stages built on [`GraphicsContext`](crate::gfx::GraphicsContext).
//!
//! Stages own their GPU resources and issue commands only through the context
//! trait, so the same code drives wgpu and the recording backend.

pub mod post;
