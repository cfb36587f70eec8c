//! Decoded frame types
//!
//! Frames are immutable once built and travel through the pipeline behind
//! `Arc`, so fan-out to several subscribers never copies pixel or sample data.

use crate::error::{MediaError, MediaResult};
use bytes::Bytes;
use rtcpipe_core::MediaKind;
use std::fmt;
use std::sync::Arc;

/// Pixel layout of a video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Planar Y, U, V with 2x2 chroma subsampling
    Yuv420p,
    /// Y plane followed by interleaved UV at 2x2 subsampling
    Nv12,
    /// Packed 8-bit RGB
    Rgb24,
    /// Packed 8-bit RGBA
    Rgba,
}

impl PixelFormat {
    /// Byte size of each plane for a `width` x `height` image
    pub fn plane_sizes(&self, width: u32, height: u32) -> Vec<usize> {
        let (w, h) = (width as usize, height as usize);
        let chroma = w.div_ceil(2) * h.div_ceil(2);
        match self {
            PixelFormat::Yuv420p => vec![w * h, chroma, chroma],
            PixelFormat::Nv12 => vec![w * h, chroma * 2],
            PixelFormat::Rgb24 => vec![w * h * 3],
            PixelFormat::Rgba => vec![w * h * 4],
        }
    }

    /// Short lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Yuv420p => "yuv420p",
            PixelFormat::Nv12 => "nv12",
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Rgba => "rgba",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sample encoding of an audio frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Interleaved signed 16-bit
    S16,
    /// One plane of signed 16-bit per channel
    S16Planar,
    /// Interleaved 32-bit float
    F32,
    /// One plane of 32-bit float per channel
    F32Planar,
}

impl SampleFormat {
    /// Whether each channel has its own plane
    pub fn is_planar(&self) -> bool {
        matches!(self, SampleFormat::S16Planar | SampleFormat::F32Planar)
    }

    /// Whether samples are floating point
    pub fn is_float(&self) -> bool {
        matches!(self, SampleFormat::F32 | SampleFormat::F32Planar)
    }

    /// Short lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            SampleFormat::S16 => "s16",
            SampleFormat::S16Planar => "s16p",
            SampleFormat::F32 => "flt",
            SampleFormat::F32Planar => "fltp",
        }
    }
}

/// Sample format, rate and channel count of an audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    /// Sample encoding
    pub format: SampleFormat,
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
}

impl AudioFormat {
    /// Build a format description
    pub const fn new(format: SampleFormat, sample_rate: u32, channels: u16) -> Self {
        Self {
            format,
            sample_rate,
            channels,
        }
    }

    /// Reject formats with no channels or a zero sample rate
    pub fn validate(&self) -> MediaResult<()> {
        if self.channels == 0 || self.sample_rate == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: format!("invalid audio format {}", self),
            });
        }
        Ok(())
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.format.name(), self.sample_rate, self.channels)
    }
}

/// Sample storage, one inner vector per plane
#[derive(Debug, Clone, PartialEq)]
pub enum SamplePlanes {
    /// 16-bit integer samples
    S16(Vec<Vec<i16>>),
    /// 32-bit float samples
    F32(Vec<Vec<f32>>),
}

/// Decoded video picture with tightly packed planes
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    format: PixelFormat,
    width: u32,
    height: u32,
    pts: i64,
    planes: Vec<Vec<u8>>,
}

impl VideoFrame {
    /// Build a frame, checking plane count and sizes against the format
    pub fn new(
        format: PixelFormat,
        width: u32,
        height: u32,
        pts: i64,
        planes: Vec<Vec<u8>>,
    ) -> MediaResult<Self> {
        let expected = format.plane_sizes(width, height);
        if planes.len() != expected.len() {
            return Err(MediaError::InvalidConfiguration {
                message: format!(
                    "{} needs {} planes, got {}",
                    format,
                    expected.len(),
                    planes.len()
                ),
            });
        }
        for (plane, size) in planes.iter().zip(&expected) {
            if plane.len() != *size {
                return Err(MediaError::InvalidFrameData {
                    expected: *size,
                    actual: plane.len(),
                });
            }
        }
        Ok(Self {
            format,
            width,
            height,
            pts,
            planes,
        })
    }

    /// Black picture (zero RGB, studio-range black for YUV)
    pub fn black(format: PixelFormat, width: u32, height: u32, pts: i64) -> Self {
        let sizes = format.plane_sizes(width, height);
        let planes = match format {
            PixelFormat::Yuv420p => vec![vec![16; sizes[0]], vec![128; sizes[1]], vec![128; sizes[2]]],
            PixelFormat::Nv12 => vec![vec![16; sizes[0]], vec![128; sizes[1]]],
            PixelFormat::Rgb24 | PixelFormat::Rgba => sizes.iter().map(|s| vec![0; *s]).collect(),
        };
        Self {
            format,
            width,
            height,
            pts,
            planes,
        }
    }

    /// Pixel format
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Presentation timestamp, 90 kHz clock
    pub fn pts(&self) -> i64 {
        self.pts
    }

    /// Plane data
    pub fn planes(&self) -> &[Vec<u8>] {
        &self.planes
    }

    /// Same picture with another timestamp
    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = pts;
        self
    }
}

/// Decoded audio samples
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    format: AudioFormat,
    nb_samples: usize,
    pts: i64,
    planes: SamplePlanes,
}

fn s16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

fn f32_to_s16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

impl AudioFrame {
    /// Build a frame, checking plane layout against the format
    pub fn new(format: AudioFormat, pts: i64, planes: SamplePlanes) -> MediaResult<Self> {
        format.validate()?;
        let channels = format.channels as usize;
        let lens: Vec<usize> = match &planes {
            SamplePlanes::S16(p) if !format.format.is_float() => p.iter().map(Vec::len).collect(),
            SamplePlanes::F32(p) if format.format.is_float() => p.iter().map(Vec::len).collect(),
            _ => {
                return Err(MediaError::InvalidConfiguration {
                    message: format!("sample storage does not match {}", format),
                })
            }
        };

        let (expected_planes, per_plane) = if format.format.is_planar() {
            (channels, 1)
        } else {
            (1, channels)
        };
        if lens.len() != expected_planes {
            return Err(MediaError::InvalidConfiguration {
                message: format!(
                    "{} needs {} planes, got {}",
                    format,
                    expected_planes,
                    lens.len()
                ),
            });
        }
        let first = lens.first().copied().unwrap_or(0);
        if first % per_plane != 0 {
            return Err(MediaError::InvalidFrameData {
                expected: (first / per_plane + 1) * per_plane,
                actual: first,
            });
        }
        if let Some(bad) = lens.iter().find(|l| **l != first) {
            return Err(MediaError::InvalidFrameData {
                expected: first,
                actual: *bad,
            });
        }

        Ok(Self {
            format,
            nb_samples: first / per_plane,
            pts,
            planes,
        })
    }

    /// Interleaved float frame
    pub fn from_f32_interleaved(
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
        pts: i64,
    ) -> MediaResult<Self> {
        Self::new(
            AudioFormat::new(SampleFormat::F32, sample_rate, channels),
            pts,
            SamplePlanes::F32(vec![samples]),
        )
    }

    /// Interleaved 16-bit frame
    pub fn from_s16_interleaved(
        samples: Vec<i16>,
        sample_rate: u32,
        channels: u16,
        pts: i64,
    ) -> MediaResult<Self> {
        Self::new(
            AudioFormat::new(SampleFormat::S16, sample_rate, channels),
            pts,
            SamplePlanes::S16(vec![samples]),
        )
    }

    /// Build a frame of `format` from interleaved float samples
    pub fn from_interleaved_as(format: AudioFormat, samples: &[f32], pts: i64) -> MediaResult<Self> {
        let channels = format.channels.max(1) as usize;
        let planes = match (format.format.is_float(), format.format.is_planar()) {
            (true, false) => SamplePlanes::F32(vec![samples.to_vec()]),
            (false, false) => SamplePlanes::S16(vec![samples.iter().map(|s| f32_to_s16(*s)).collect()]),
            (true, true) => SamplePlanes::F32(
                (0..channels)
                    .map(|c| samples.iter().skip(c).step_by(channels).copied().collect())
                    .collect(),
            ),
            (false, true) => SamplePlanes::S16(
                (0..channels)
                    .map(|c| {
                        samples
                            .iter()
                            .skip(c)
                            .step_by(channels)
                            .map(|s| f32_to_s16(*s))
                            .collect()
                    })
                    .collect(),
            ),
        };
        Self::new(format, pts, planes)
    }

    /// Samples converted to interleaved float
    pub fn to_f32_interleaved(&self) -> Vec<f32> {
        let channels = self.format.channels as usize;
        match (&self.planes, self.format.format.is_planar()) {
            (SamplePlanes::F32(p), false) => p[0].clone(),
            (SamplePlanes::S16(p), false) => p[0].iter().map(|s| s16_to_f32(*s)).collect(),
            (SamplePlanes::F32(p), true) => {
                let mut out = Vec::with_capacity(self.nb_samples * channels);
                for i in 0..self.nb_samples {
                    out.extend(p.iter().map(|plane| plane[i]));
                }
                out
            }
            (SamplePlanes::S16(p), true) => {
                let mut out = Vec::with_capacity(self.nb_samples * channels);
                for i in 0..self.nb_samples {
                    out.extend(p.iter().map(|plane| s16_to_f32(plane[i])));
                }
                out
            }
        }
    }

    /// Format description
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Sample encoding
    pub fn sample_format(&self) -> SampleFormat {
        self.format.format
    }

    /// Sample rate
    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    /// Channel count
    pub fn channels(&self) -> u16 {
        self.format.channels
    }

    /// Samples per channel
    pub fn nb_samples(&self) -> usize {
        self.nb_samples
    }

    /// Presentation timestamp in units of the sample rate
    pub fn pts(&self) -> i64 {
        self.pts
    }

    /// Raw sample planes
    pub fn planes(&self) -> &SamplePlanes {
        &self.planes
    }

    /// Float plane `index`, if the frame holds float samples
    pub fn f32_plane(&self, index: usize) -> Option<&[f32]> {
        match &self.planes {
            SamplePlanes::F32(p) => p.get(index).map(Vec::as_slice),
            SamplePlanes::S16(_) => None,
        }
    }

    /// 16-bit plane `index`, if the frame holds integer samples
    pub fn s16_plane(&self, index: usize) -> Option<&[i16]> {
        match &self.planes {
            SamplePlanes::S16(p) => p.get(index).map(Vec::as_slice),
            SamplePlanes::F32(_) => None,
        }
    }

    /// Same samples with another timestamp
    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = pts;
        self
    }
}

/// A decoded frame on a channel. `None` in its place means end of stream.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaFrame {
    /// Video picture
    Video(Arc<VideoFrame>),
    /// Audio samples
    Audio(Arc<AudioFrame>),
}

impl MediaFrame {
    /// Media kind of the frame
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaFrame::Video(_) => MediaKind::Video,
            MediaFrame::Audio(_) => MediaKind::Audio,
        }
    }

    /// Presentation timestamp
    pub fn pts(&self) -> i64 {
        match self {
            MediaFrame::Video(v) => v.pts(),
            MediaFrame::Audio(a) => a.pts(),
        }
    }
}

impl From<VideoFrame> for MediaFrame {
    fn from(frame: VideoFrame) -> Self {
        MediaFrame::Video(Arc::new(frame))
    }
}

impl From<AudioFrame> for MediaFrame {
    fn from(frame: AudioFrame) -> Self {
        MediaFrame::Audio(Arc::new(frame))
    }
}

/// Encoded access unit as produced by an encoder or reassembled by a depacketizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPacket {
    /// Bitstream bytes (Annex-B for H.26x, raw for Opus)
    pub data: Bytes,
    /// Timestamp in the codec's RTP clock
    pub pts: i64,
}

impl EncodedPacket {
    /// Wrap bytes with a timestamp
    pub fn new(data: impl Into<Bytes>, pts: i64) -> Self {
        Self {
            data: data.into(),
            pts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_sizes() {
        assert_eq!(PixelFormat::Yuv420p.plane_sizes(4, 2), vec![8, 2, 2]);
        assert_eq!(PixelFormat::Nv12.plane_sizes(3, 3), vec![9, 8]);
        assert_eq!(PixelFormat::Rgb24.plane_sizes(2, 2), vec![12]);
    }

    #[test]
    fn test_video_frame_validation() {
        let ok = VideoFrame::new(PixelFormat::Rgb24, 2, 2, 5, vec![vec![0; 12]]);
        assert!(ok.is_ok());

        let short = VideoFrame::new(PixelFormat::Rgb24, 2, 2, 5, vec![vec![0; 10]]);
        assert!(matches!(short, Err(MediaError::InvalidFrameData { expected: 12, actual: 10 })));
    }

    #[test]
    fn test_audio_planar_round_trip() {
        let interleaved = vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let format = AudioFormat::new(SampleFormat::F32Planar, 48000, 2);
        let frame = AudioFrame::from_interleaved_as(format, &interleaved, 7).unwrap();

        assert_eq!(frame.nb_samples(), 3);
        assert_eq!(frame.f32_plane(1).unwrap(), &[-0.1, -0.2, -0.3]);
        assert_eq!(frame.to_f32_interleaved(), interleaved);
    }

    #[test]
    fn test_s16_conversion_exact() {
        let samples = vec![i16::MIN, -1, 0, 1, i16::MAX];
        let frame = AudioFrame::from_s16_interleaved(samples.clone(), 8000, 1, 0).unwrap();
        let back = AudioFrame::from_interleaved_as(frame.format(), &frame.to_f32_interleaved(), 0)
            .unwrap();
        assert_eq!(back.s16_plane(0).unwrap(), samples.as_slice());
    }

    #[test]
    fn test_audio_frame_rejects_ragged_interleave() {
        let err = AudioFrame::from_f32_interleaved(vec![0.0; 5], 48000, 2, 0).unwrap_err();
        assert!(matches!(err, MediaError::InvalidFrameData { .. }));
    }
}
