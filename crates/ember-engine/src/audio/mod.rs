//! Audio stream adapters.
//!
//! Decoding itself is delegated to `symphonia`; this module only adapts
//! decoded streams to the fixed-size PCM interfaces the engine consumes.

pub mod oggvorbis;
