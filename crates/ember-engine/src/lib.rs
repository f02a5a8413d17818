//! Ember engine crate.
//!
//! Leaf pieces of a 3D engine plus the platform + GPU runtime that hosts them:
//! - `audio`: Ogg Vorbis streams exposed as fixed-size PCM16 reads
//! - `gfx`: GL-style graphics context over wgpu, plus a recording backend
//! - `render`: the offscreen composite postprocessing stage

pub mod audio;
pub mod gfx;
pub mod render;

pub mod core;
pub mod device;
pub mod time;
pub mod window;

pub mod logging;
