//! Integration tests for codec glue
//!
//! Packetizer/depacketizer round trips and codec factory availability.

use rtcpipe_core::CodecId;
use rtcpipe_media::*;

fn access_unit(nals: &[&[u8]]) -> Vec<u8> {
    let mut au = Vec::new();
    for nal in nals {
        au.extend_from_slice(&packetizer::START_CODE);
        au.extend_from_slice(nal);
    }
    au
}

fn round_trip(codec: CodecId, mtu: usize, au: &[u8]) -> Vec<u8> {
    let packetizer = Packetizer::for_codec(codec, mtu).unwrap();
    let mut depacketizer = Depacketizer::for_codec(codec);
    let payloads = packetizer.packetize(au);
    assert!(payloads.iter().all(|p| p.len() <= mtu));

    let last = payloads.len() - 1;
    let mut out = None;
    for (i, payload) in payloads.iter().enumerate() {
        let unit = depacketizer.push(payload, i == last).unwrap();
        if i < last {
            assert!(unit.is_none());
        }
        out = unit;
    }
    out.unwrap().to_vec()
}

// ============================================================================
// H.264
// ============================================================================

#[test]
fn test_h264_small_nals_pass_whole() {
    let sps: &[u8] = &[0x67, 0x42, 0xe0, 0x1f];
    let pps: &[u8] = &[0x68, 0xce, 0x3c, 0x80];
    let au = access_unit(&[sps, pps]);

    let packetizer = Packetizer::for_format("H264", 1200).unwrap();
    let payloads = packetizer.packetize(&au);
    assert_eq!(payloads.len(), 2);
    assert_eq!(&payloads[0][..], sps);

    assert_eq!(round_trip(CodecId::H264, 1200, &au), au);
}

#[test]
fn test_h264_large_idr_fragments() {
    let idr: Vec<u8> = std::iter::once(0x65).chain((0..5000).map(|i| (i % 251) as u8)).collect();
    let au = access_unit(&[&[0x67, 0x42, 0xe0, 0x1f], &idr]);

    assert_eq!(round_trip(CodecId::H264, 1200, &au), au);
}

#[test]
fn test_h264_fragment_without_start_dropped() {
    let mut depacketizer = Depacketizer::for_codec(CodecId::H264);
    // FU-A middle fragment, no start bit
    let orphan = [0x7c, 0x05, 1, 2, 3];
    assert!(depacketizer.push(&orphan, true).unwrap().is_none());

    let single = [0x41, 9, 9];
    let unit = depacketizer.push(&single, true).unwrap().unwrap();
    assert_eq!(&unit[..], &[0, 0, 0, 1, 0x41, 9, 9][..]);
}

// ============================================================================
// H.265
// ============================================================================

#[test]
fn test_h265_large_nal_round_trip() {
    let vps: &[u8] = &[0x40, 0x01, 0x0c];
    let idr: Vec<u8> = [0x26, 0x01].into_iter().chain((0..3000).map(|i| (i % 200) as u8 + 1)).collect();
    let au = access_unit(&[vps, &idr]);

    assert_eq!(round_trip(CodecId::H265, 1200, &au), au);
}

#[test]
fn test_h265_aggregation_packet() {
    let mut depacketizer = Depacketizer::for_format("H265").unwrap();
    // AP header (type 48), then two length-prefixed NAL units
    let payload = [0x60, 0x01, 0, 3, 0x40, 0x01, 0x0c, 0, 2, 0x42, 0x01];
    let unit = depacketizer.push(&payload, true).unwrap().unwrap();
    assert_eq!(
        &unit[..],
        &[0, 0, 0, 1, 0x40, 0x01, 0x0c, 0, 0, 0, 1, 0x42, 0x01][..]
    );
}

// ============================================================================
// OPUS
// ============================================================================

#[test]
fn test_opus_passthrough() {
    let packetizer = Packetizer::for_format("opus", 1200).unwrap();
    let payloads = packetizer.packetize(&[0xfc, 0xff, 0xfe]);
    assert_eq!(payloads.len(), 1);

    let mut depacketizer = Depacketizer::for_format("OPUS").unwrap();
    let frame = depacketizer.push(&payloads[0], false).unwrap().unwrap();
    assert_eq!(&frame[..], &[0xfc, 0xff, 0xfe][..]);
}

// ============================================================================
// FACTORY
// ============================================================================

#[test]
fn test_unsupported_format_is_fatal() {
    let err = Packetizer::for_format("AV1", 1200).unwrap_err();
    assert!(!err.is_recoverable());
    assert_eq!(err.category(), ErrorCategory::Format);
}

#[test]
fn test_factory_reports_codec_in_error() {
    let factory = DefaultCodecFactory::new();
    match factory.decoder(CodecId::H265) {
        Err(MediaError::CodecInitializationFailed { codec, .. }) => {
            assert_eq!(codec, CodecId::H265.to_string())
        }
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
}
