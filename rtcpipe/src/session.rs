//! Peer session descriptions
//!
//! Holds the current local and remote descriptions of one peer connection
//! and answers the questions transceivers ask about them.

use rtcpipe_core::{
    build_supported_media, negotiate_answer_media, negotiate_rtp_map, Direction,
    MediaDescription, MediaKind, RtcError, RtcResult, RtpMap, SdpType, SessionDescription,
};
use tracing::debug;

/// Current local and remote session descriptions of a peer
#[derive(Debug, Clone, Default)]
pub struct PeerSession {
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
}

impl PeerSession {
    /// Session with no descriptions yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and store the local description
    pub fn set_local_description(&mut self, sdp: &str, sdp_type: SdpType) -> RtcResult<()> {
        let description = SessionDescription::parse(sdp, sdp_type)?;
        debug!(
            "Local {} set with {} sections",
            sdp_type,
            description.section_count()
        );
        self.local = Some(description);
        Ok(())
    }

    /// Parse and store the remote description
    pub fn set_remote_description(&mut self, sdp: &str, sdp_type: SdpType) -> RtcResult<()> {
        let description = SessionDescription::parse(sdp, sdp_type)?;
        debug!(
            "Remote {} set with {} sections",
            sdp_type,
            description.section_count()
        );
        self.remote = Some(description);
        Ok(())
    }

    /// Store an already built local description
    pub fn set_local(&mut self, description: SessionDescription) {
        self.local = Some(description);
    }

    /// Current local description
    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local.as_ref()
    }

    /// Current remote description
    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote.as_ref()
    }

    fn remote_offer(&self) -> RtcResult<&SessionDescription> {
        match &self.remote {
            Some(remote) if remote.sdp_type() == SdpType::Offer => Ok(remote),
            Some(remote) => Err(RtcError::InvalidState {
                expected: "remote offer".to_string(),
                actual: format!("remote {}", remote.sdp_type()),
            }),
            None => Err(RtcError::InvalidState {
                expected: "remote offer".to_string(),
                actual: "no remote description".to_string(),
            }),
        }
    }

    /// Answer section for the remote offer's media section at `index`
    pub fn create_answer(
        &self,
        index: usize,
        direction: Direction,
        kind: MediaKind,
        stream_ids: &[String],
        track_id: Option<&str>,
    ) -> RtcResult<Option<MediaDescription>> {
        negotiate_answer_media(self.remote_offer()?, index, direction, kind, stream_ids, track_id)
    }

    /// Section offering every supported codec of `kind`
    pub fn create_offer_media(
        &self,
        mid: &str,
        direction: Direction,
        kind: MediaKind,
        stream_ids: &[String],
        track_id: Option<&str>,
    ) -> RtcResult<MediaDescription> {
        build_supported_media(mid, direction, kind, stream_ids, track_id)
    }

    /// Codec used on the wire for `mid`, once both descriptions are set
    pub fn negotiated_rtp_map(&self, mid: &str) -> Option<RtpMap> {
        match (&self.remote, &self.local) {
            (Some(remote), Some(local)) => negotiate_rtp_map(remote, local, mid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFER: &str = "v=0\r\n\
o=- 1 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:0\r\n\
a=sendrecv\r\n\
a=rtpmap:96 H264/90000\r\n\
a=fmtp:96 profile-level-id=42e01f;packetization-mode=1;level-asymmetry-allowed=1\r\n";

    #[test]
    fn test_answer_requires_remote_offer() {
        let session = PeerSession::new();
        let err = session
            .create_answer(0, Direction::SendRecv, MediaKind::Video, &[], None)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_STATE");
    }

    #[test]
    fn test_answer_from_remote_offer() {
        let mut session = PeerSession::new();
        session.set_remote_description(OFFER, SdpType::Offer).unwrap();

        let answer = session
            .create_answer(0, Direction::RecvOnly, MediaKind::Video, &[], None)
            .unwrap()
            .unwrap();
        assert_eq!(answer.payload_types(), vec![96]);
        assert_eq!(answer.direction(), Direction::RecvOnly);
        assert!(session.negotiated_rtp_map("0").is_none());
    }
}
