//! # rtcpipe Core
//!
//! Session description model and codec negotiation engine for the rtcpipe
//! media pipeline. Everything in this crate is synchronous and free of
//! shared state; negotiation functions take descriptions by reference and
//! return new values.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod capability;
pub mod error;
pub mod negotiate;
pub mod sdp;

// Re-export main types
pub use capability::{supported_codecs, CodecId};
pub use error::{RtcError, RtcResult};
pub use negotiate::{
    build_supported_media, extract_fmtp_value, fmtps_string, negotiate_answer_media,
    negotiate_rtp_map, rtp_maps_match,
};
pub use sdp::{Direction, MediaDescription, MediaKind, RtpMap, SdpType, SessionDescription, SsrcBinding};
