//! Ogg Vorbis stream adapter.
//!
//! Exposes an Ogg Vorbis stream through a PCM16 byte interface:
//! - open from a local file or from a packaged [`ResourceSet`]
//! - fixed-size reads of native-endian signed 16-bit samples
//! - stream info, sample-accurate seeking and length queries
//!
//! Chained (multi-link) files are read as one stream; lengths and positions
//! span every link.

mod decoder;
mod error;
mod file;
mod pcm;
mod reader;
mod source;

pub use decoder::SymphoniaReader;
pub use error::{OggVorbisError, Result};
pub use file::{Origin, PcmRead, StreamInfo, VorbisFile};
pub use pcm::{f32_to_pcm16, Pcm16Writer, BYTES_PER_DECODED_SAMPLE, BYTES_PER_PCM16_SAMPLE};
pub use reader::{Bitrate, DecodeFailure, VorbisReader};
pub use source::{EmbeddedAssets, ResourceSet, Source};
