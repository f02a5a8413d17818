use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::decoder::SymphoniaReader;
use super::error::{OggVorbisError, Result};
use super::pcm::{Pcm16Writer, BYTES_PER_DECODED_SAMPLE};
use super::reader::VorbisReader;
use super::source::{ResourceSet, Source};

/// Basic information about an open Vorbis stream.
///
/// Bitrates are in bits per second; `0` means unset by the encoder.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct StreamInfo {
    pub version: u32,
    pub channels: u16,
    pub rate: u32,
    pub bitrate_upper: i32,
    pub bitrate_nominal: i32,
    pub bitrate_lower: i32,
}

/// Outcome of a successful [`VorbisFile::read`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PcmRead {
    /// PCM16 bytes written at the start of the output buffer.
    pub bytes_written: usize,
    /// Logical bitstream the samples came from. Always `0`.
    pub link: i32,
}

/// Where a [`VorbisFile`] was opened from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    LocalFile(PathBuf),
    PackagedResource(String),
    /// Stream built directly from a [`VorbisReader`].
    Reader,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::LocalFile(p) => write!(f, "{}", p.display()),
            Origin::PackagedResource(p) => write!(f, "embedded:{p}"),
            Origin::Reader => f.write_str("<reader>"),
        }
    }
}

/// An open Ogg Vorbis stream read as PCM16.
///
/// The handle owns its byte source through the reader. [`close`](Self::close)
/// releases both; every other operation then fails with
/// [`OggVorbisError::Closed`].
pub struct VorbisFile {
    origin: Origin,
    reader: Option<Box<dyn VorbisReader>>,
    scratch: Vec<f32>,
}

impl VorbisFile {
    /// Opens a local Ogg Vorbis file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let open_err = |reason: String| OggVorbisError::Open {
            path: path.display().to_string(),
            reason,
        };

        let file = File::open(path).map_err(|e| open_err(e.to_string()))?;
        let reader = SymphoniaReader::new(Source::local(file)).map_err(open_err)?;

        Ok(Self::from_reader(
            Origin::LocalFile(path.to_path_buf()),
            Box::new(reader),
        ))
    }

    /// Opens an Ogg Vorbis stream from a packaged resource set.
    pub fn open_embedded(path: &str, resources: &dyn ResourceSet) -> Result<Self> {
        let open_err = |reason: String| OggVorbisError::Open {
            path: path.to_string(),
            reason,
        };

        let bytes = resources.open(path).map_err(|e| open_err(e.to_string()))?;
        let reader = SymphoniaReader::new(Source::packaged(bytes)).map_err(open_err)?;

        Ok(Self::from_reader(
            Origin::PackagedResource(path.to_string()),
            Box::new(reader),
        ))
    }

    /// Wraps an already-open reader.
    pub fn from_reader(origin: Origin, reader: Box<dyn VorbisReader>) -> Self {
        log::debug!(
            "ogg vorbis stream opened: {origin} channels={} rate={} frames={}",
            reader.channels(),
            reader.sample_rate(),
            reader.length()
        );
        Self {
            origin,
            reader: Some(reader),
            scratch: Vec::new(),
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Releases the source and decoder. Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            log::debug!("ogg vorbis stream closed: {}", self.origin);
        }
        self.scratch = Vec::new();
    }

    /// Decodes into `out` as native-endian i16 samples.
    ///
    /// At most `out.len() / 4` samples are decoded per call, so
    /// `bytes_written <= out.len() / 2`. `0` bytes means end of stream. On a
    /// decode error the bytes written before it remain valid and are reported
    /// in [`OggVorbisError::Decode`].
    pub fn read(&mut self, out: &mut [u8]) -> Result<PcmRead> {
        let reader = self.reader.as_mut().ok_or(OggVorbisError::Closed)?;

        let samples = out.len() / BYTES_PER_DECODED_SAMPLE;
        self.scratch.resize(samples, 0.0);

        let (decoded, failure) = match reader.read(&mut self.scratch[..samples]) {
            Ok(n) => (n, None),
            Err(f) => (f.decoded, Some(f.reason)),
        };
        let decoded = decoded.min(samples);

        let mut writer = Pcm16Writer::new(out);
        writer.extend_from_f32(&self.scratch[..decoded]);
        let written = writer.bytes_written();

        if let Some(reason) = failure {
            log::warn!("ogg vorbis read from {}: {decoded} samples, {reason}", self.origin);
            return Err(OggVorbisError::Decode { written, reason });
        }

        Ok(PcmRead {
            bytes_written: written,
            link: 0,
        })
    }

    /// Returns stream info. `link` selects a logical bitstream and is ignored.
    pub fn info(&self, link: i32) -> Result<StreamInfo> {
        let reader = self.reader()?;
        log_ignored_link(link);

        let bitrate = reader.bitrate();
        Ok(StreamInfo {
            version: reader.version(),
            channels: reader.channels(),
            rate: reader.sample_rate(),
            bitrate_upper: bitrate.maximum,
            bitrate_nominal: bitrate.nominal,
            bitrate_lower: bitrate.minimum,
        })
    }

    /// Only seekable sources can be opened.
    pub fn seekable(&self) -> bool {
        true
    }

    /// Seeks to PCM frame `position`; the next read starts there.
    ///
    /// Positions outside `0..=pcm_total` are rejected without moving.
    pub fn pcm_seek(&mut self, position: i64) -> Result<()> {
        let reader = self.reader.as_mut().ok_or(OggVorbisError::Closed)?;
        let seek_err = |reason: String| OggVorbisError::Seek { position, reason };

        let total = reader.length();
        let frame = u64::try_from(position).map_err(|_| seek_err("negative position".into()))?;
        if frame > total {
            return Err(seek_err(format!("past end of stream ({total} frames)")));
        }

        reader.set_position(frame).map_err(seek_err)
    }

    /// Current read position in PCM frames.
    pub fn pcm_tell(&self) -> Result<i64> {
        Ok(self.reader()?.position() as i64)
    }

    /// Total PCM frames across all logical bitstreams. `link` is ignored.
    pub fn pcm_total(&self, link: i32) -> Result<i64> {
        let reader = self.reader()?;
        log_ignored_link(link);

        match reader.length() {
            0 => Err(OggVorbisError::EmptyStream),
            n => Ok(n as i64),
        }
    }

    /// Total duration in seconds. `link` is ignored.
    pub fn time_total(&self, link: i32) -> Result<f64> {
        let frames = self.pcm_total(link)?;
        Ok(frames as f64 / self.rate()? as f64)
    }

    /// Current read position in seconds.
    pub fn time_tell(&self) -> Result<f64> {
        let frames = self.pcm_tell()?;
        Ok(frames as f64 / self.rate()? as f64)
    }

    fn rate(&self) -> Result<u32> {
        Ok(self.reader()?.sample_rate().max(1))
    }

    fn reader(&self) -> Result<&dyn VorbisReader> {
        self.reader.as_deref().ok_or(OggVorbisError::Closed)
    }
}

impl Drop for VorbisFile {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for VorbisFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VorbisFile")
            .field("origin", &self.origin)
            .field("open", &self.is_open())
            .finish()
    }
}

fn log_ignored_link(link: i32) {
    if link >= 0 {
        log::debug!("logical bitstream {link} requested; chained streams are read as one");
    }
}
