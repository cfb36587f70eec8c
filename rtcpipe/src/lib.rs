//! # rtcpipe - WebRTC media pipeline core
//!
//! rtcpipe sits between an application producing or consuming decoded media
//! and a WebRTC transport that moves RTP. It negotiates codecs from session
//! descriptions, routes decoded frames through named channels, buffers them
//! per track and wires each negotiated RTP track to the right encoder,
//! decoder and packetizer.
//!
//! ## Key Features
//!
//! - **SDP negotiation**: H.264 profile matching, H.265 profile/tier
//!   matching and Opus, with answers that keep the offer's payload types
//! - **Frame pipe**: publish/subscribe on named channels with end-of-stream
//!   delivery and re-entrant callbacks
//! - **Track buffers**: PTS-ordered video buffer and a fixed-size audio FIFO
//!   with resampling and channel remixing
//! - **Transceivers**: RTP track wiring driven by the negotiated codec
//!
//! ## Quick Start
//!
//! ```rust
//! use rtcpipe::{EngineConfig, MediaEngine, MediaFrame, MediaKind, PixelFormat, VideoFrame};
//!
//! let engine = MediaEngine::new(EngineConfig::default())?;
//! let track = engine.create_track(MediaKind::Video)?;
//! engine.attach_track(track, "camera")?;
//!
//! let frame = MediaFrame::from(VideoFrame::black(PixelFormat::Rgb24, 4, 4, 0));
//! engine.publish("camera", Some(&frame));
//! assert_eq!(engine.track(track).map(|t| t.len()), Some(1));
//! # Ok::<(), rtcpipe::RtcError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use rtcpipe_core::{
    build_supported_media, negotiate_answer_media, negotiate_rtp_map, rtp_maps_match,
    supported_codecs, CodecId, Direction, MediaDescription, MediaKind, RtcError, RtcResult,
    RtpMap, SdpType, SessionDescription, SsrcBinding,
};

pub use rtcpipe_media::{
    AudioBufferConfig, AudioFormat, AudioFrame, CodecFactory, DefaultCodecFactory, Depacketizer,
    EncodedPacket, FramePipe, MediaError, MediaFrame, MediaResult, MediaTrack, OpusConfig,
    Packetizer, PixelFormat, SampleFormat, SubscriptionId, SyncDecoder, SyncEncoder, TrackId,
    VideoBufferConfig, VideoFrame,
};

// Public API modules
pub mod config;
pub mod engine;
pub mod logging;
pub mod session;
pub mod transceiver;

// Re-export main API types
pub use config::EngineConfig;
pub use engine::MediaEngine;
pub use logging::init_logging;
pub use session::PeerSession;
pub use transceiver::{RtpTrack, Transceiver};
