//! # rtcpipe Media
//!
//! Decoded-frame plumbing for the rtcpipe pipeline: the named-channel frame
//! pipe, per-track reorder and FIFO buffers with the format conversion they
//! need, and the codec and packetizer glue used by transceivers.

#![warn(clippy::all)]

pub mod buffer;
pub mod codecs;
pub mod error;
pub mod fifo;
pub mod frame;
pub mod framepipe;
pub mod packetizer;
pub mod registry;
pub mod resample;
pub mod scale;
pub mod track;

// Re-export main types
pub use buffer::{
    AudioBufferConfig, AudioTrackBuffer, VideoBufferConfig, VideoTrackBuffer, TRACK_AUDIO_FORMAT,
};
pub use codecs::{
    CodecFactory, DefaultCodecFactory, OpusConfig, SyncDecoder, SyncEncoder, OPUS_FORMAT,
    OPUS_FRAME_SIZE,
};
pub use error::{ErrorCategory, MediaError, MediaResult};
pub use fifo::AudioFifo;
pub use frame::{
    AudioFormat, AudioFrame, EncodedPacket, MediaFrame, PixelFormat, SampleFormat, SamplePlanes,
    VideoFrame,
};
pub use framepipe::{FramePipe, SubscriptionId};
pub use packetizer::{split_annex_b, Depacketizer, Packetizer};
pub use registry::{BufferedCallback, HookId, TrackId, TrackRegistry};
pub use resample::{remix_channels, Resampler};
pub use scale::Scaler;
pub use track::MediaTrack;
