//! Integration tests for the session description model

use rtcpipe_core::*;

const BROWSER_OFFER: &str = "v=0\r\n\
o=- 8129638452516215001 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1 2\r\n\
a=msid-semantic: WMS\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111 0\r\n\
c=IN IP4 0.0.0.0\r\n\
a=rtcp:9 IN IP4 0.0.0.0\r\n\
a=ice-ufrag:Qx2m\r\n\
a=mid:0\r\n\
a=sendonly\r\n\
a=rtcp-mux\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=rtcp-fb:111 transport-cc\r\n\
a=fmtp:111 minptime=10;useinbandfec=1\r\n\
a=ssrc:2501 cname:abc\r\n\
a=ssrc:2501 msid:s1 t1\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 102 104\r\n\
c=IN IP4 0.0.0.0\r\n\
b=AS:2000\r\n\
a=mid:1\r\n\
a=recvonly\r\n\
a=rtpmap:102 H264/90000\r\n\
a=rtcp-fb:102 nack\r\n\
a=rtcp-fb:102 nack pli\r\n\
a=fmtp:102 level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42001f\r\n\
a=rtpmap:104 H265/90000\r\n\
a=rtcp-fb:* ccm fir\r\n\
m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:2\r\n\
a=sctp-port:5000\r\n";

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_parse_browser_offer() {
    let desc = SessionDescription::parse(BROWSER_OFFER, SdpType::Offer).unwrap();

    assert_eq!(desc.sdp_type(), SdpType::Offer);
    assert_eq!(desc.section_count(), 3);

    let audio = desc.media(0).unwrap();
    assert_eq!(audio.kind(), MediaKind::Audio);
    assert_eq!(audio.direction(), Direction::SendOnly);
    assert_eq!(audio.payload_types(), vec![111, 0]);
    // static payload type 0 has no rtpmap
    assert_eq!(audio.rtp_maps().len(), 1);

    let opus = audio.rtp_map(111).unwrap();
    assert_eq!(opus.clock_rate(), 48000);
    assert_eq!(opus.encoding_params(), Some("2"));
    assert_eq!(opus.feedback(), ["transport-cc".to_string()]);

    let video = desc.media_by_mid("1").unwrap();
    assert_eq!(video.direction(), Direction::RecvOnly);
    assert_eq!(video.rtp_map(102).unwrap().feedback().len(), 2);
    assert!(video.extra_lines().iter().any(|l| l == "a=rtcp-fb:* ccm fir"));
    assert!(video.extra_lines().iter().any(|l| l == "b=AS:2000"));

    assert!(desc.media(2).is_none());
    assert!(desc.media_by_mid("2").is_none());
}

#[test]
fn test_parse_lf_only() {
    let text = BROWSER_OFFER.replace("\r\n", "\n");
    let lf = SessionDescription::parse(&text, SdpType::Offer).unwrap();
    let crlf = SessionDescription::parse(BROWSER_OFFER, SdpType::Offer).unwrap();
    assert_eq!(lf, crlf);
}

#[test]
fn test_ssrc_bindings_grouped() {
    let desc = SessionDescription::parse(BROWSER_OFFER, SdpType::Offer).unwrap();
    let ssrcs = desc.media(0).unwrap().ssrcs();

    assert_eq!(ssrcs.len(), 1);
    assert_eq!(ssrcs[0].ssrc, 2501);
    assert_eq!(ssrcs[0].cname.as_deref(), Some("abc"));
    assert_eq!(ssrcs[0].stream_id.as_deref(), Some("s1"));
    assert_eq!(ssrcs[0].track_id.as_deref(), Some("t1"));
}

#[test]
fn test_invalid_payload_type_reports_line() {
    let text = "v=0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96\r\na=fmtp:abc x=1\r\n";
    match SessionDescription::parse(text, SdpType::Offer) {
        Err(RtcError::SdpParse { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected parse error, got {:?}", other),
    }
}

// ============================================================================
// Generation
// ============================================================================

#[test]
fn test_round_trip_preserves_content() {
    let desc = SessionDescription::parse(BROWSER_OFFER, SdpType::Offer).unwrap();
    let generated = desc.generate();
    let again = SessionDescription::parse(&generated, SdpType::Offer).unwrap();

    assert_eq!(desc, again);
    assert_eq!(generated, again.generate());
    assert!(generated.ends_with("\r\n"));
}

#[test]
fn test_attribute_order_within_section() {
    let desc = SessionDescription::parse(BROWSER_OFFER, SdpType::Offer).unwrap();
    let video = desc.media(1).unwrap().generate_sdp();
    let lines: Vec<&str> = video.split("\r\n").filter(|l| !l.is_empty()).collect();

    let position = |needle: &str| lines.iter().position(|l| l.starts_with(needle)).unwrap();
    assert_eq!(position("m=video"), 0);
    assert!(position("a=mid:1") < position("a=recvonly"));
    assert!(position("a=rtpmap:102") < position("a=fmtp:102"));
    assert!(position("a=fmtp:102") < position("a=rtcp-fb:102 nack"));
    assert!(position("a=rtcp-fb:102 nack pli") < position("a=rtpmap:104"));
}

#[test]
fn test_programmatic_description() {
    let mut media = MediaDescription::new(MediaKind::Audio, "a0", Direction::Inactive);
    media.add_rtp_map(RtpMap::new(111, "opus", 48000).with_encoding_params("2"));
    media.add_rtp_map(RtpMap::new(9, "G722", 8000));

    let mut desc = SessionDescription::new(SdpType::Answer);
    desc.add_attribute("group:BUNDLE a0");
    desc.add_media(media);

    let text = desc.to_string();
    assert!(text.starts_with("v=0\r\n"));
    assert!(text.contains("a=group:BUNDLE a0\r\n"));
    assert!(text.contains("m=audio 9 UDP/TLS/RTP/SAVPF 111 9\r\n"));
    assert!(text.contains("a=inactive\r\n"));
    assert!(!text.contains("a=fmtp"));

    let parsed = SessionDescription::parse(&text, SdpType::Answer).unwrap();
    assert_eq!(parsed, desc);
}
