use std::collections::VecDeque;
use std::io;

use symphonia::core::audio::{AudioBufferRef, SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_VORBIS};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::reader::{Bitrate, DecodeFailure, VorbisReader};
use super::source::Source;

/// Largest Vorbis block; pre-roll when the header carries no block size.
const MAX_BLOCK_FRAMES: u64 = 8192;

/// [`VorbisReader`] backed by symphonia's Ogg demuxer and Vorbis decoder.
///
/// Chained files are decoded link after link as one stream. A link whose
/// channel count or rate differs from the first ends the stream. Opening
/// demuxes the whole file once to measure its links.
pub struct SymphoniaReader {
    track: Track,
    /// Second handle on the bytes, used to restart from the first link.
    spare: Source,
    channels: u16,
    sample_rate: u32,
    header: IdentHeader,
    /// Frame count of each decodable link, in file order.
    links: Vec<u64>,
    /// Index into `links` of the link being decoded.
    link: usize,

    /// Interleaved samples handed out since frame 0.
    consumed: u64,
    /// Link-relative frame the next output must start at after a seek.
    seek_target: Option<u64>,
    /// The demuxer moved past the last decodable link.
    links_ended: bool,

    sample_buf: Option<SampleBuffer<f32>>,
    pending: VecDeque<f32>,
}

/// Demuxer and decoder bound to the Vorbis track of the current link.
struct Track {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    id: u32,
    params: CodecParameters,
}

impl Track {
    fn open(source: Source) -> Result<Self, String> {
        let mut hint = Hint::new();
        hint.with_extension("ogg");

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };
        let mss = MediaSourceStream::new(Box::new(source), MediaSourceStreamOptions::default());
        let opened = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &MetadataOptions::default())
            .map_err(|e| format!("not a readable ogg stream: {e}"))?;

        let format = opened.format;
        let (id, params) = vorbis_track(format.as_ref())?;
        let decoder = make_decoder(&params)?;

        Ok(Self {
            format,
            decoder,
            id,
            params,
        })
    }

    /// Rebinds to the Vorbis track of the link the demuxer just entered.
    fn enter_next_link(&mut self) -> Result<(), String> {
        let (id, params) = vorbis_track(self.format.as_ref())?;
        self.decoder = make_decoder(&params)?;
        self.id = id;
        self.params = params;
        Ok(())
    }

    /// Demuxes past the rest of the current link and enters the next one.
    ///
    /// Returns `Ok(false)` if the file ends first.
    fn skip_link(&mut self) -> Result<bool, String> {
        loop {
            match self.format.next_packet() {
                Ok(_) => continue,
                Err(SymphoniaError::ResetRequired) => {
                    self.enter_next_link()?;
                    return Ok(true);
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Ok(false);
                }
                Err(e) => return Err(format!("read packet failed: {e}")),
            }
        }
    }

    /// Walks every link and returns the frame counts of those matching
    /// `channels` and `rate`, stopping at the first that does not.
    fn link_lengths(mut self, channels: u16, rate: u32) -> Vec<u64> {
        let mut lengths = vec![self.params.n_frames.unwrap_or(0)];
        loop {
            match self.skip_link() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    log::warn!("ogg link scan stopped after {} link(s): {e}", lengths.len());
                    break;
                }
            }

            let (link_channels, link_rate) = spec_of(&self.params);
            if link_channels != channels || link_rate != rate {
                log::warn!(
                    "ogg link {} is {link_channels} ch @ {link_rate} Hz, expected {channels} ch @ \
                     {rate} Hz; stream ends before it",
                    lengths.len()
                );
                break;
            }
            lengths.push(self.params.n_frames.unwrap_or(0));
        }
        lengths
    }

    fn seek(&mut self, ts: u64) -> Result<(), String> {
        let seeked = self
            .format
            .seek(SeekMode::Accurate, SeekTo::TimeStamp { ts, track_id: self.id })
            .map_err(|e| format!("seek failed: {e}"))?;
        log::trace!(
            "vorbis seek: required_ts={} actual_ts={}",
            seeked.required_ts,
            seeked.actual_ts
        );
        self.decoder.reset();
        Ok(())
    }

    /// Frames decoded ahead of a seek target. The first packet after a
    /// decoder reset yields nothing, and the next one starts at most half a
    /// long block later.
    fn preroll(&self) -> u64 {
        let header = self.params.extra_data.as_deref().and_then(IdentHeader::parse);
        match header.map(|h| h.long_block) {
            None | Some(0) => MAX_BLOCK_FRAMES,
            Some(n) => u64::from(n),
        }
    }
}

fn vorbis_track(format: &dyn FormatReader) -> Result<(u32, CodecParameters), String> {
    format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec == CODEC_TYPE_VORBIS)
        .map(|t| (t.id, t.codec_params.clone()))
        .ok_or_else(|| "no vorbis track in stream".to_string())
}

fn make_decoder(params: &CodecParameters) -> Result<Box<dyn Decoder>, String> {
    symphonia::default::get_codecs()
        .make(params, &DecoderOptions::default())
        .map_err(|e| format!("decoder init failed: {e}"))
}

fn spec_of(params: &CodecParameters) -> (u16, u32) {
    let channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);
    (channels, params.sample_rate.unwrap_or(0))
}

/// Maps a stream frame to `(link, frame within link)`. A frame on a link
/// boundary belongs to the later link; the total maps to the end of the
/// last link.
fn locate(links: &[u64], frame: u64) -> (usize, u64) {
    let mut start = 0;
    for (i, &len) in links.iter().enumerate() {
        if frame < start + len {
            return (i, frame - start);
        }
        start += len;
    }
    let last = links.len().saturating_sub(1);
    (last, links.get(last).map_or(0, |&len| frame - (start - len)))
}

impl SymphoniaReader {
    /// Opens `source`, scans its links and binds a Vorbis decoder to the
    /// first one.
    pub fn new(source: Source) -> Result<Self, String> {
        let spare = source
            .try_clone()
            .map_err(|e| format!("source clone failed: {e}"))?;
        let scan = Track::open(source)?;

        let (channels, sample_rate) = spec_of(&scan.params);
        if sample_rate == 0 || channels == 0 {
            return Err(format!(
                "missing stream spec: sample_rate={sample_rate} channels={channels}"
            ));
        }
        let header = scan
            .params
            .extra_data
            .as_deref()
            .and_then(IdentHeader::parse)
            .unwrap_or_default();
        if scan.params.n_frames.is_none() {
            log::debug!("vorbis track {} does not report a frame count", scan.id);
        }

        let links = scan.link_lengths(channels, sample_rate);
        if links.len() > 1 {
            log::debug!("chained ogg stream: {} links, frames {links:?}", links.len());
        }
        let track = open_rewound(&spare)?;

        Ok(Self {
            track,
            spare,
            channels,
            sample_rate,
            header,
            links,
            link: 0,
            consumed: 0,
            seek_target: None,
            links_ended: false,
            sample_buf: None,
            pending: VecDeque::new(),
        })
    }

    /// Decodes the next packet into `pending`, crossing link boundaries.
    ///
    /// Returns `Ok(false)` at end of stream.
    fn decode_next(&mut self) -> Result<bool, String> {
        if self.links_ended {
            return Ok(false);
        }
        loop {
            let packet = match self.track.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    if self.link + 1 >= self.links.len() {
                        log::debug!("ogg stream ends before link {}", self.link + 1);
                        self.links_ended = true;
                        return Ok(false);
                    }
                    self.track.enter_next_link()?;
                    self.link += 1;
                    self.seek_target = None;
                    log::debug!("entered ogg link {}", self.link);
                    continue;
                }
                Err(e) => return Err(format!("read packet failed: {e}")),
            };
            if packet.track_id() != self.track.id {
                continue;
            }

            let ts = packet.ts();
            match self.track.decoder.decode(&packet) {
                Ok(audio_buf) => {
                    let frames = audio_buf.frames() as u64;
                    if frames == 0 {
                        continue;
                    }
                    append_decoded(&mut self.sample_buf, &mut self.pending, audio_buf);
                    self.trim_to_seek_target(ts, frames);
                    if !self.pending.is_empty() {
                        return Ok(true);
                    }
                }
                Err(SymphoniaError::ResetRequired) => self.track.decoder.reset(),
                Err(e) => return Err(format!("decode failed: {e}")),
            }
        }
    }

    /// Drops the part of a freshly decoded packet that lies before the seek
    /// target. `ts` is the packet's first output frame.
    fn trim_to_seek_target(&mut self, ts: u64, frames: u64) {
        let Some(target) = self.seek_target else {
            return;
        };
        if ts > target {
            log::debug!("vorbis seek overshot: output resumes at {ts}, wanted {target}");
            self.seek_target = None;
            return;
        }

        let skip = (target - ts).min(frames);
        self.pending.drain(..(skip * self.channels as u64) as usize);
        if skip < frames {
            self.seek_target = None;
        }
    }
}

/// Opens the source again from its first byte.
fn open_rewound(spare: &Source) -> Result<Track, String> {
    let source = spare
        .try_clone()
        .map_err(|e| format!("source clone failed: {e}"))?;
    Track::open(source)
}

impl VorbisReader for SymphoniaReader {
    fn read(&mut self, out: &mut [f32]) -> Result<usize, DecodeFailure> {
        let mut filled = 0;

        while filled < out.len() {
            if self.pending.is_empty() {
                match self.decode_next() {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(reason) => {
                        self.consumed += filled as u64;
                        return Err(DecodeFailure { decoded: filled, reason });
                    }
                }
            }

            let n = self.pending.len().min(out.len() - filled);
            for (dst, src) in out[filled..filled + n].iter_mut().zip(self.pending.drain(..n)) {
                *dst = src;
            }
            filled += n;
        }

        self.consumed += filled as u64;
        Ok(filled)
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn bitrate(&self) -> Bitrate {
        self.header.bitrate
    }

    fn version(&self) -> u32 {
        self.header.version
    }

    fn set_position(&mut self, frame: u64) -> Result<(), String> {
        let (link, local) = locate(&self.links, frame);
        if link == self.link && !self.links_ended {
            let ts = local.saturating_sub(self.track.preroll());
            self.track.seek(ts)?;
        } else {
            let mut track = open_rewound(&self.spare)?;
            for _ in 0..link {
                if !track.skip_link()? {
                    return Err(format!("link {link} is missing"));
                }
            }
            track.seek(local.saturating_sub(track.preroll()))?;
            self.track = track;
            self.link = link;
            self.links_ended = false;
        }

        self.pending.clear();
        self.seek_target = Some(local);
        self.consumed = frame * self.channels as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.consumed / self.channels.max(1) as u64
    }

    fn length(&self) -> u64 {
        self.links.iter().sum()
    }
}

fn append_decoded(
    sample_buf: &mut Option<SampleBuffer<f32>>,
    pending: &mut VecDeque<f32>,
    audio_buf: AudioBufferRef<'_>,
) {
    let spec = SignalSpec::new(audio_buf.spec().rate, audio_buf.spec().channels);
    let duration = audio_buf.capacity() as u64;
    let needed = audio_buf.capacity() * spec.channels.count();
    let needs_realloc = sample_buf.as_ref().is_none_or(|buf| buf.capacity() < needed);
    if needs_realloc {
        *sample_buf = Some(SampleBuffer::<f32>::new(duration, spec));
    }

    let Some(sample_buf) = sample_buf.as_mut() else {
        return;
    };
    sample_buf.copy_interleaved_ref(audio_buf);
    pending.extend(sample_buf.samples().iter().copied());
}

/// Fields of the Vorbis identification header that symphonia does not surface.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
struct IdentHeader {
    version: u32,
    bitrate: Bitrate,
    /// Long block size in samples; `0` if the header is out of range.
    long_block: u32,
}

impl IdentHeader {
    const LEN: usize = 30;
    const SIGNATURE: &'static [u8; 7] = b"\x01vorbis";

    /// Parses the header at the start of `buf`.
    fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN || !buf.starts_with(Self::SIGNATURE) {
            return None;
        }
        let u32_at =
            |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        let i32_at = |at: usize| u32_at(at) as i32;
        let long_exp = buf[28] >> 4;

        Some(Self {
            version: u32_at(7),
            bitrate: Bitrate {
                maximum: i32_at(16),
                nominal: i32_at(20),
                minimum: i32_at(24),
            },
            long_block: if (6..=13).contains(&long_exp) {
                1 << long_exp
            } else {
                0
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn ident(version: u32, max: i32, nominal: i32, min: i32) -> Vec<u8> {
        let mut buf = b"\x01vorbis".to_vec();
        buf.extend_from_slice(&version.to_le_bytes());
        buf.push(2); // channels
        buf.extend_from_slice(&44_100u32.to_le_bytes());
        buf.extend_from_slice(&max.to_le_bytes());
        buf.extend_from_slice(&nominal.to_le_bytes());
        buf.extend_from_slice(&min.to_le_bytes());
        buf.push(0xb8); // blocksizes
        buf.push(1); // framing
        buf
    }

    #[test]
    fn parses_ident_header_bitrates() {
        let h = IdentHeader::parse(&ident(0, 256_000, 128_000, 64_000)).unwrap();
        assert_eq!(h.version, 0);
        assert_eq!(h.long_block, 2048);
        assert_eq!(
            h.bitrate,
            Bitrate {
                minimum: 64_000,
                nominal: 128_000,
                maximum: 256_000
            }
        );
    }

    #[test]
    fn unset_bitrate_bounds_stay_zero() {
        let h = IdentHeader::parse(&ident(0, 0, 160_000, 0)).unwrap();
        assert_eq!(h.bitrate.minimum, 0);
        assert_eq!(h.bitrate.maximum, 0);
        assert_eq!(h.bitrate.nominal, 160_000);
    }

    #[test]
    fn rejects_short_or_foreign_headers() {
        assert!(IdentHeader::parse(&ident(0, 0, 0, 0)[..20]).is_none());
        let mut other = ident(0, 0, 0, 0);
        other[1] = b'V';
        assert!(IdentHeader::parse(&other).is_none());
    }

    #[test]
    fn out_of_range_block_size_is_unset() {
        let mut buf = ident(0, 0, 0, 0);
        buf[28] = 0xf8;
        assert_eq!(IdentHeader::parse(&buf).unwrap().long_block, 0);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let src = Source::packaged(Arc::from(vec![0x42u8; 4096]));
        assert!(SymphoniaReader::new(src).is_err());
    }

    const SWEEP: &[u8] = include_bytes!("testdata/sweep.ogg");
    const CHAINED: &[u8] = include_bytes!("testdata/chained.ogg");

    fn reader(bytes: &[u8]) -> SymphoniaReader {
        SymphoniaReader::new(Source::packaged(Arc::from(bytes))).unwrap()
    }

    fn read_to_end(reader: &mut SymphoniaReader) -> Vec<f32> {
        let mut out = Vec::new();
        let mut buf = vec![0.0f32; 1000];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    #[test]
    fn sweep_header_and_length() {
        let r = reader(SWEEP);
        assert_eq!(r.channels(), 2);
        assert_eq!(r.sample_rate(), 22_050);
        assert_eq!(r.length(), 22_050);
        assert_eq!(r.header.long_block, 1024);
        assert!(r.bitrate().nominal > 0);
    }

    #[test]
    fn decodes_exactly_the_encoded_frames() {
        let mut r = reader(SWEEP);
        let samples = read_to_end(&mut r);
        assert_eq!(samples.len(), 2 * 22_050);
        assert_eq!(r.position(), 22_050);
        assert!(samples.iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn locate_maps_frames_to_links() {
        let links = [100, 50];
        assert_eq!(locate(&links, 0), (0, 0));
        assert_eq!(locate(&links, 99), (0, 99));
        assert_eq!(locate(&links, 100), (1, 0));
        assert_eq!(locate(&links, 149), (1, 49));
        assert_eq!(locate(&links, 150), (1, 50));
        assert_eq!(locate(&[], 0), (0, 0));
    }

    #[test]
    fn chained_stream_length_sums_links() {
        let r = reader(CHAINED);
        assert_eq!(r.links, vec![22_050, 11_025]);
        assert_eq!(r.length(), 33_075);
    }

    #[test]
    fn chained_stream_reads_across_link_boundary() {
        let first = read_to_end(&mut reader(SWEEP));
        let mut r = reader(CHAINED);

        let samples = read_to_end(&mut r);
        assert_eq!(samples.len(), 2 * 33_075);
        assert_eq!(&samples[..first.len()], &first[..]);
        assert!(samples[first.len()..].iter().any(|s| s.abs() > 0.1));
        assert_eq!(r.position(), r.length());
    }

    #[test]
    fn chained_stream_seeks_between_links() {
        let reference = read_to_end(&mut reader(CHAINED));
        let mut r = reader(CHAINED);
        let mut buf = vec![0.0f32; 512];

        for frame in [25_000u64, 5_000, 22_050, 22_000, 33_000] {
            r.set_position(frame).unwrap();
            let start = 2 * frame as usize;
            let want = &reference[start..(start + 512).min(reference.len())];
            let n = r.read(&mut buf).unwrap();
            assert_eq!(&buf[..n], want, "frame {frame}");
        }
    }
}
