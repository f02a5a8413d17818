//! Float to PCM16 packing.

/// Scale applied to nominal `[-1, 1]` float samples.
const PCM16_SCALE: f32 = 32768.0;

/// Bytes of caller capacity consumed per decoded sample.
///
/// Reads size their f32 staging buffer as `capacity / 4`, so a read never
/// fills more than half of the caller's buffer.
pub const BYTES_PER_DECODED_SAMPLE: usize = 4;

/// Bytes written per output sample.
pub const BYTES_PER_PCM16_SAMPLE: usize = 2;

/// Converts a float sample to signed 16-bit PCM.
///
/// Computes `round(s * 32768)` and saturates to the i16 range, so `1.0` maps to
/// `32767` instead of wrapping negative. NaN maps to `0`.
#[inline]
pub fn f32_to_pcm16(s: f32) -> i16 {
    let scaled = (s * PCM16_SCALE).round();
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Write cursor over a byte buffer that accepts whole i16 samples.
///
/// Samples are stored native-endian, two bytes each. A trailing odd byte is
/// never touched.
#[derive(Debug)]
pub struct Pcm16Writer<'a> {
    out: &'a mut [u8],
    samples: usize,
}

impl<'a> Pcm16Writer<'a> {
    #[inline]
    pub fn new(out: &'a mut [u8]) -> Self {
        Self { out, samples: 0 }
    }

    /// Remaining room, in samples.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.out.len() / BYTES_PER_PCM16_SAMPLE - self.samples
    }

    /// Appends one sample. Returns `false` when the buffer is full.
    #[inline]
    pub fn push(&mut self, sample: i16) -> bool {
        let start = self.samples * BYTES_PER_PCM16_SAMPLE;
        let Some(slot) = self.out.get_mut(start..start + BYTES_PER_PCM16_SAMPLE) else {
            return false;
        };
        slot.copy_from_slice(&sample.to_ne_bytes());
        self.samples += 1;
        true
    }

    /// Converts and appends float samples until the buffer is full.
    ///
    /// Returns the number of samples written.
    pub fn extend_from_f32(&mut self, samples: &[f32]) -> usize {
        let n = samples.len().min(self.remaining());
        for &s in &samples[..n] {
            self.push(f32_to_pcm16(s));
        }
        n
    }

    #[inline]
    pub fn samples_written(&self) -> usize {
        self.samples
    }

    #[inline]
    pub fn bytes_written(&self) -> usize {
        self.samples * BYTES_PER_PCM16_SAMPLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_i16(bytes: &[u8], i: usize) -> i16 {
        i16::from_ne_bytes([bytes[2 * i], bytes[2 * i + 1]])
    }

    #[test]
    fn converts_with_rounding() {
        assert_eq!(f32_to_pcm16(0.0), 0);
        assert_eq!(f32_to_pcm16(0.5), 16384);
        assert_eq!(f32_to_pcm16(-0.5), -16384);
        // Fractions of one step round to the nearest step.
        assert_eq!(f32_to_pcm16(1.0 / 32768.0 * 0.6), 1);
        assert_eq!(f32_to_pcm16(1.0 / 32768.0 * 0.4), 0);
    }

    #[test]
    fn full_scale_does_not_wrap() {
        assert_eq!(f32_to_pcm16(1.0), i16::MAX);
        assert_eq!(f32_to_pcm16(-1.0), i16::MIN);
        assert_eq!(f32_to_pcm16(4.0), i16::MAX);
        assert_eq!(f32_to_pcm16(-4.0), i16::MIN);
    }

    #[test]
    fn nan_is_silence() {
        assert_eq!(f32_to_pcm16(f32::NAN), 0);
    }

    #[test]
    fn writer_stops_at_capacity() {
        let mut buf = [0u8; 5];
        let mut w = Pcm16Writer::new(&mut buf);
        assert_eq!(w.remaining(), 2);
        assert!(w.push(7));
        assert!(w.push(-7));
        assert!(!w.push(1));
        assert_eq!(w.bytes_written(), 4);
        assert_eq!(buf[4], 0);
        assert_eq!(read_i16(&buf, 0), 7);
        assert_eq!(read_i16(&buf, 1), -7);
    }

    #[test]
    fn extend_truncates_to_room() {
        let mut buf = [0u8; 6];
        let mut w = Pcm16Writer::new(&mut buf);
        let n = w.extend_from_f32(&[0.5, -0.5, 1.0, 0.25]);
        assert_eq!(n, 3);
        assert_eq!(w.samples_written(), 3);
        assert_eq!(read_i16(&buf, 2), i16::MAX);
    }
}
