//! Codec interfaces and wrapped implementations
//!
//! Encoders and decoders are synchronous and internally locked, so a single
//! instance can be shared between the thread that feeds it and whoever
//! tears it down. Real codecs come from `openh264` and `audiopus` behind the
//! `h264` and `opus` features; without them the factory reports the codec
//! as unavailable instead of substituting a fake bitstream.

use crate::error::{MediaError, MediaResult};
use crate::frame::{AudioFormat, EncodedPacket, MediaFrame, SampleFormat};
use rtcpipe_core::CodecId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format the Opus wrappers encode from and decode to
pub const OPUS_FORMAT: AudioFormat = AudioFormat::new(SampleFormat::F32, 48_000, 2);

/// Samples per channel in one 20 ms Opus frame
pub const OPUS_FRAME_SIZE: usize = 960;

/// Encodes decoded frames into access units
pub trait SyncEncoder: Send + Sync + fmt::Debug {
    /// Codec produced
    fn codec(&self) -> CodecId;

    /// Encode one frame; `None` flushes whatever the encoder holds.
    ///
    /// May return zero or several packets per call.
    fn encode(&self, frame: Option<&MediaFrame>) -> MediaResult<Vec<EncodedPacket>>;
}

/// Decodes access units into frames
pub trait SyncDecoder: Send + Sync + fmt::Debug {
    /// Codec consumed
    fn codec(&self) -> CodecId;

    /// Decode one access unit; `None` drains buffered pictures.
    fn decode(&self, packet: Option<&EncodedPacket>) -> MediaResult<Vec<MediaFrame>>;
}

/// Creates encoders and decoders for negotiated codecs
pub trait CodecFactory: Send + Sync + fmt::Debug {
    /// Encoder for `codec`
    fn encoder(&self, codec: CodecId) -> MediaResult<Box<dyn SyncEncoder>>;

    /// Decoder for `codec`
    fn decoder(&self, codec: CodecId) -> MediaResult<Box<dyn SyncDecoder>>;
}

/// Opus encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpusConfig {
    /// Target bitrate in bits per second
    pub bitrate: u32,
}

impl Default for OpusConfig {
    fn default() -> Self {
        Self { bitrate: 64_000 }
    }
}

/// Factory backed by `openh264` and `audiopus`
#[derive(Debug, Clone, Default)]
pub struct DefaultCodecFactory {
    #[cfg_attr(not(feature = "opus"), allow(dead_code))]
    opus: OpusConfig,
}

impl DefaultCodecFactory {
    /// Factory with default codec settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with explicit Opus settings
    pub fn with_opus_config(opus: OpusConfig) -> Self {
        Self { opus }
    }
}

impl CodecFactory for DefaultCodecFactory {
    fn encoder(&self, codec: CodecId) -> MediaResult<Box<dyn SyncEncoder>> {
        match codec {
            #[cfg(feature = "opus")]
            CodecId::Opus => Ok(Box::new(opus::OpusEncoder::new(self.opus)?)),
            #[cfg(feature = "h264")]
            CodecId::H264 => Ok(Box::new(h264::H264Encoder::new()?)),
            other => Err(unavailable(other)),
        }
    }

    fn decoder(&self, codec: CodecId) -> MediaResult<Box<dyn SyncDecoder>> {
        match codec {
            #[cfg(feature = "opus")]
            CodecId::Opus => Ok(Box::new(opus::OpusDecoder::new()?)),
            #[cfg(feature = "h264")]
            CodecId::H264 => Ok(Box::new(h264::H264Decoder::new()?)),
            other => Err(unavailable(other)),
        }
    }
}

fn unavailable(codec: CodecId) -> MediaError {
    let reason = match codec {
        CodecId::H265 => "no H.265 codec is bundled",
        CodecId::H264 => "built without the `h264` feature",
        CodecId::Opus => "built without the `opus` feature",
    };
    MediaError::CodecInitializationFailed {
        codec: codec.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(any(feature = "opus", feature = "h264"))]
fn wrong_kind(expected: rtcpipe_core::MediaKind, frame: &MediaFrame) -> MediaError {
    MediaError::InvalidMediaType {
        expected: expected.to_string(),
        actual: frame.kind().to_string(),
    }
}

#[cfg(feature = "opus")]
mod opus {
    use super::{wrong_kind, OpusConfig, OPUS_FORMAT, OPUS_FRAME_SIZE};
    use crate::error::{MediaError, MediaResult};
    use crate::fifo::FifoQueue;
    use crate::frame::{AudioFrame, EncodedPacket, MediaFrame};
    use crate::resample::ResampleState;
    use audiopus::coder::{Decoder, Encoder};
    use audiopus::{Application, Bitrate, Channels, SampleRate};
    use parking_lot::Mutex;
    use rtcpipe_core::{CodecId, MediaKind};
    use std::fmt;
    use tracing::trace;

    // Largest packet libopus recommends allocating for
    const MAX_PACKET_SIZE: usize = 4000;
    // 120 ms at 48 kHz
    const MAX_FRAME_SIZE: usize = 5760;

    fn encode_error(e: audiopus::Error) -> MediaError {
        MediaError::EncodingFailed {
            codec: CodecId::Opus.to_string(),
            reason: format!("{:?}", e),
        }
    }

    fn decode_error(e: audiopus::Error) -> MediaError {
        MediaError::DecodingFailed {
            codec: CodecId::Opus.to_string(),
            reason: format!("{:?}", e),
        }
    }

    struct EncodeState {
        encoder: Encoder,
        resampler: ResampleState,
        fifo: FifoQueue,
    }

    /// Opus encoder taking audio in any layout.
    ///
    /// Input is resampled to float stereo 48 kHz and cut into 960-sample
    /// frames; a partial frame waits for the next call.
    pub(super) struct OpusEncoder {
        state: Mutex<EncodeState>,
    }

    impl OpusEncoder {
        pub(super) fn new(config: OpusConfig) -> MediaResult<Self> {
            let mut encoder = Encoder::new(SampleRate::Hz48000, Channels::Stereo, Application::Voip)
                .map_err(|e| MediaError::CodecInitializationFailed {
                    codec: CodecId::Opus.to_string(),
                    reason: format!("{:?}", e),
                })?;
            encoder
                .set_bitrate(Bitrate::BitsPerSecond(config.bitrate as i32))
                .map_err(|e| MediaError::CodecInitializationFailed {
                    codec: CodecId::Opus.to_string(),
                    reason: format!("{:?}", e),
                })?;

            Ok(Self {
                state: Mutex::new(EncodeState {
                    encoder,
                    resampler: ResampleState::default(),
                    fifo: FifoQueue::with_format(OPUS_FORMAT),
                }),
            })
        }
    }

    impl fmt::Debug for OpusEncoder {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("OpusEncoder").finish_non_exhaustive()
        }
    }

    impl super::SyncEncoder for OpusEncoder {
        fn codec(&self) -> CodecId {
            CodecId::Opus
        }

        fn encode(&self, frame: Option<&MediaFrame>) -> MediaResult<Vec<EncodedPacket>> {
            let audio = match frame {
                Some(MediaFrame::Audio(audio)) => Some(audio.as_ref()),
                Some(other) => return Err(wrong_kind(MediaKind::Audio, other)),
                None => None,
            };

            let mut guard = self.state.lock();
            let state = &mut *guard;
            if let Some(converted) = state.resampler.resample(audio, OPUS_FORMAT)? {
                state.fifo.write(&converted)?;
            }

            let mut packets = Vec::new();
            while let Some(chunk) = state.fifo.read(OPUS_FRAME_SIZE)? {
                let mut output = vec![0u8; MAX_PACKET_SIZE];
                let len = state
                    .encoder
                    .encode_float(&chunk.to_f32_interleaved(), &mut output)
                    .map_err(encode_error)?;
                output.truncate(len);
                trace!("Opus packet {} bytes pts={}", len, chunk.pts());
                packets.push(EncodedPacket::new(output, chunk.pts()));
            }
            Ok(packets)
        }
    }

    /// Opus decoder producing float stereo 48 kHz
    pub(super) struct OpusDecoder {
        decoder: Mutex<Decoder>,
    }

    impl OpusDecoder {
        pub(super) fn new() -> MediaResult<Self> {
            let decoder = Decoder::new(SampleRate::Hz48000, Channels::Stereo).map_err(|e| {
                MediaError::CodecInitializationFailed {
                    codec: CodecId::Opus.to_string(),
                    reason: format!("{:?}", e),
                }
            })?;
            Ok(Self {
                decoder: Mutex::new(decoder),
            })
        }
    }

    impl fmt::Debug for OpusDecoder {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("OpusDecoder").finish_non_exhaustive()
        }
    }

    impl super::SyncDecoder for OpusDecoder {
        fn codec(&self) -> CodecId {
            CodecId::Opus
        }

        fn decode(&self, packet: Option<&EncodedPacket>) -> MediaResult<Vec<MediaFrame>> {
            let packet = match packet {
                Some(packet) if !packet.data.is_empty() => packet,
                Some(_) => {
                    return Err(MediaError::DecodingFailed {
                        codec: CodecId::Opus.to_string(),
                        reason: "empty packet".to_string(),
                    })
                }
                None => return Ok(Vec::new()),
            };

            let channels = OPUS_FORMAT.channels as usize;
            let mut samples = vec![0f32; MAX_FRAME_SIZE * channels];
            let decoded = self
                .decoder
                .lock()
                .decode_float(Some(&packet.data[..]), &mut samples, false)
                .map_err(decode_error)?;
            samples.truncate(decoded * channels);

            let frame = AudioFrame::from_f32_interleaved(
                samples,
                OPUS_FORMAT.sample_rate,
                OPUS_FORMAT.channels,
                packet.pts,
            )?;
            Ok(vec![MediaFrame::from(frame)])
        }
    }
}

#[cfg(feature = "h264")]
mod h264 {
    use super::wrong_kind;
    use crate::error::{MediaError, MediaResult};
    use crate::frame::{EncodedPacket, MediaFrame, PixelFormat, VideoFrame};
    use crate::scale::Scaler;
    use openh264::decoder::Decoder;
    use openh264::encoder::Encoder;
    use openh264::formats::{YUVBuffer, YUVSource};
    use parking_lot::Mutex;
    use rtcpipe_core::{CodecId, MediaKind};
    use std::fmt;
    use tracing::trace;

    fn init_error(e: openh264::Error) -> MediaError {
        MediaError::CodecInitializationFailed {
            codec: CodecId::H264.to_string(),
            reason: e.to_string(),
        }
    }

    /// H.264 encoder producing Annex-B access units
    pub(super) struct H264Encoder {
        encoder: Mutex<Encoder>,
        scaler: Scaler,
    }

    impl H264Encoder {
        pub(super) fn new() -> MediaResult<Self> {
            Ok(Self {
                encoder: Mutex::new(Encoder::new().map_err(init_error)?),
                scaler: Scaler::new(),
            })
        }
    }

    impl fmt::Debug for H264Encoder {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("H264Encoder").finish_non_exhaustive()
        }
    }

    impl super::SyncEncoder for H264Encoder {
        fn codec(&self) -> CodecId {
            CodecId::H264
        }

        fn encode(&self, frame: Option<&MediaFrame>) -> MediaResult<Vec<EncodedPacket>> {
            let video = match frame {
                Some(MediaFrame::Video(video)) => video,
                Some(other) => return Err(wrong_kind(MediaKind::Video, other)),
                None => return Ok(Vec::new()),
            };
            let (width, height) = (video.width(), video.height());
            if width % 2 != 0 || height % 2 != 0 {
                return Err(MediaError::InvalidConfiguration {
                    message: format!("H.264 needs even dimensions, got {}x{}", width, height),
                });
            }

            let yuv = self.scaler.scale(video, PixelFormat::Yuv420p, width, height)?;
            let buffer = YUVBuffer::from_vec(yuv.planes().concat(), width as usize, height as usize);
            let bitstream = self
                .encoder
                .lock()
                .encode(&buffer)
                .map_err(|e| MediaError::EncodingFailed {
                    codec: CodecId::H264.to_string(),
                    reason: e.to_string(),
                })?
                .to_vec();

            if bitstream.is_empty() {
                trace!("H.264 encoder skipped pts={}", video.pts());
                return Ok(Vec::new());
            }
            Ok(vec![EncodedPacket::new(bitstream, video.pts())])
        }
    }

    /// H.264 decoder producing YUV 4:2:0 pictures
    pub(super) struct H264Decoder {
        decoder: Mutex<Decoder>,
    }

    impl H264Decoder {
        pub(super) fn new() -> MediaResult<Self> {
            Ok(Self {
                decoder: Mutex::new(Decoder::new().map_err(init_error)?),
            })
        }
    }

    impl fmt::Debug for H264Decoder {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("H264Decoder").finish_non_exhaustive()
        }
    }

    fn copy_plane(src: &[u8], stride: usize, width: usize, height: usize) -> Vec<u8> {
        let mut plane = Vec::with_capacity(width * height);
        for row in 0..height {
            let start = row * stride;
            plane.extend_from_slice(&src[start..start + width]);
        }
        plane
    }

    impl super::SyncDecoder for H264Decoder {
        fn codec(&self) -> CodecId {
            CodecId::H264
        }

        fn decode(&self, packet: Option<&EncodedPacket>) -> MediaResult<Vec<MediaFrame>> {
            let packet = match packet {
                Some(packet) => packet,
                None => return Ok(Vec::new()),
            };

            let mut decoder = self.decoder.lock();
            let yuv = match decoder.decode(&packet.data) {
                Ok(Some(yuv)) => yuv,
                Ok(None) => return Ok(Vec::new()),
                Err(e) => {
                    return Err(MediaError::DecodingFailed {
                        codec: CodecId::H264.to_string(),
                        reason: e.to_string(),
                    })
                }
            };

            let (width, height) = yuv.dimensions();
            let (y_stride, u_stride, v_stride) = yuv.strides();
            let (cw, ch) = (width.div_ceil(2), height.div_ceil(2));
            let planes = vec![
                copy_plane(yuv.y(), y_stride, width, height),
                copy_plane(yuv.u(), u_stride, cw, ch),
                copy_plane(yuv.v(), v_stride, cw, ch),
            ];
            let frame = VideoFrame::new(
                PixelFormat::Yuv420p,
                width as u32,
                height as u32,
                packet.pts,
                planes,
            )?;
            Ok(vec![MediaFrame::from(frame)])
        }
    }
}
