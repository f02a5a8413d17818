//! Offscreen composite postprocessing.
//!
//! The scene is rendered into a stage-owned framebuffer, whose color texture is
//! then drawn over the default target with a full-screen quad and a
//! time-animated program.

mod postprocessor;
mod quad;
mod scene;

pub use postprocessor::{Postprocessor, PostprocessorInit, SetupError, StageGuard, TIME_UNIFORM};
pub use quad::{QuadVertex, SCREEN_QUAD};
pub use scene::{SceneFn, SceneRenderer};

/// Bundled composite vertex shader (WGSL).
pub const COMPOSITE_VERTEX_WGSL: &str = include_str!("shaders/composite_vs.wgsl");

/// Bundled composite fragment shader (WGSL).
pub const COMPOSITE_FRAGMENT_WGSL: &str = include_str!("shaders/composite_fs.wgsl");
