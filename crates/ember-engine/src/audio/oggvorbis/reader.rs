/// Bitrate bounds from the Vorbis identification header, in bits per second.
///
/// `0` means the encoder left the bound unset.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Bitrate {
    pub minimum: i32,
    pub nominal: i32,
    pub maximum: i32,
}

/// Decode error raised part-way through a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    /// Samples written to the output before the failure.
    pub decoded: usize,
    pub reason: String,
}

/// Decoder collaborator behind [`VorbisFile`](super::VorbisFile).
///
/// Positions and lengths are in PCM frames (one sample per channel). Reads
/// produce interleaved samples.
pub trait VorbisReader {
    /// Fills `out` with interleaved samples, returning how many were written.
    ///
    /// Returns fewer than `out.len()` only at end of stream or on failure.
    fn read(&mut self, out: &mut [f32]) -> Result<usize, DecodeFailure>;

    fn channels(&self) -> u16;

    fn sample_rate(&self) -> u32;

    fn bitrate(&self) -> Bitrate;

    /// Vorbis format version from the identification header.
    fn version(&self) -> u32;

    /// Moves the read position to `frame`. On error the position is unchanged.
    fn set_position(&mut self, frame: u64) -> Result<(), String>;

    /// Current read position.
    fn position(&self) -> u64;

    /// Total frames across all links; `0` when unknown or empty.
    fn length(&self) -> u64;
}
