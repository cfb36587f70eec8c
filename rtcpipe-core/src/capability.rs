//! Locally supported codecs
//!
//! The table here is what `build_supported_media` announces and what
//! answers are matched against. Order is preference order.

use crate::sdp::{MediaKind, RtpMap};
use std::fmt;

/// Payload type announced for H.264
pub const H264_PAYLOAD_TYPE: u8 = 96;
/// Payload type announced for H.265
pub const H265_PAYLOAD_TYPE: u8 = 104;
/// Payload type announced for Opus
pub const OPUS_PAYLOAD_TYPE: u8 = 111;

/// Default H.264 parameters: Constrained Baseline, level 3.1
pub const H264_DEFAULT_FMTP: &str =
    "profile-level-id=42e01f;packetization-mode=1;level-asymmetry-allowed=1";

/// Opus parameters announced for stereo with in-band FEC
pub const OPUS_DEFAULT_FMTP: &str =
    "minptime=10;maxaveragebitrate=96000;stereo=1;sprop-stereo=1;useinbandfec=1";

/// RTCP feedback announced for every video codec
pub const VIDEO_FEEDBACK: [&str; 3] = ["nack", "nack pli", "goog-remb"];

/// Codec families the pipeline can packetize, encode and decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    H265,
    /// Opus
    Opus,
}

impl CodecId {
    /// Family of an rtpmap format name, case-insensitive
    pub fn from_format(format: &str) -> Option<Self> {
        match format.to_ascii_lowercase().as_str() {
            "h264" => Some(CodecId::H264),
            "h265" => Some(CodecId::H265),
            "opus" => Some(CodecId::Opus),
            _ => None,
        }
    }

    /// Family of a negotiated entry
    pub fn from_rtp_map(map: &RtpMap) -> Option<Self> {
        Self::from_format(map.format())
    }

    /// Canonical rtpmap format name
    pub fn format_name(&self) -> &'static str {
        match self {
            CodecId::H264 => "H264",
            CodecId::H265 => "H265",
            CodecId::Opus => "opus",
        }
    }

    /// RTP clock rate
    pub fn clock_rate(&self) -> u32 {
        match self {
            CodecId::H264 | CodecId::H265 => 90_000,
            CodecId::Opus => 48_000,
        }
    }

    /// Media kind carried by this codec
    pub fn kind(&self) -> MediaKind {
        match self {
            CodecId::H264 | CodecId::H265 => MediaKind::Video,
            CodecId::Opus => MediaKind::Audio,
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.format_name())
    }
}

fn video_codec(payload_type: u8, codec: CodecId, fmtp: Option<&str>) -> RtpMap {
    let map = RtpMap::new(payload_type, codec.format_name(), codec.clock_rate())
        .with_feedback(VIDEO_FEEDBACK);
    match fmtp {
        Some(fmtp) => map.with_parameters(fmtp.split(';')),
        None => map,
    }
}

/// Supported codecs for a kind, in preference order. Empty for data channels.
pub fn supported_codecs(kind: MediaKind) -> Vec<RtpMap> {
    match kind {
        MediaKind::Video => vec![
            video_codec(H265_PAYLOAD_TYPE, CodecId::H265, None),
            video_codec(H264_PAYLOAD_TYPE, CodecId::H264, Some(H264_DEFAULT_FMTP)),
        ],
        MediaKind::Audio => vec![RtpMap::new(
            OPUS_PAYLOAD_TYPE,
            CodecId::Opus.format_name(),
            CodecId::Opus.clock_rate(),
        )
        .with_encoding_params("2")
        .with_parameters(OPUS_DEFAULT_FMTP.split(';'))],
        MediaKind::Application => Vec::new(),
    }
}
