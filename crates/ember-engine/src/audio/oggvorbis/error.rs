use thiserror::Error;

/// Errors reported by [`VorbisFile`](super::VorbisFile).
#[derive(Debug, Error)]
pub enum OggVorbisError {
    /// The byte source could not be opened or holds no valid Vorbis header.
    #[error("failed to open ogg vorbis stream `{path}`: {reason}")]
    Open { path: String, reason: String },

    /// The requested PCM position was rejected. The stream position is unchanged.
    #[error("cannot seek to pcm frame {position}: {reason}")]
    Seek { position: i64, reason: String },

    /// The stream reports zero PCM frames.
    #[error("ogg vorbis stream has 0 samples")]
    EmptyStream,

    /// Decoding failed part-way through a read.
    ///
    /// `written` bytes at the start of the output buffer are valid PCM.
    #[error("ogg vorbis decode failed after {written} bytes: {reason}")]
    Decode { written: usize, reason: String },

    /// The handle was closed.
    #[error("ogg vorbis stream is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, OggVorbisError>;
