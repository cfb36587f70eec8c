//! Codec negotiation
//!
//! Pure functions over session descriptions: typed `fmtp` getters, codec
//! compatibility, answer construction and final payload type selection.
//! Nothing here holds state, so renegotiation can call any of it again.

use crate::capability::{supported_codecs, CodecId};
use crate::error::{RtcError, RtcResult};
use crate::sdp::{
    Direction, MediaDescription, MediaKind, RtpMap, SdpType, SessionDescription, SsrcBinding,
};
use tracing::debug;

/// Default `profile-level-id`: Constrained Baseline, level 3.1
pub const DEFAULT_PROFILE_LEVEL_ID: u32 = 0x42e01f;

/// Value of `key` in a `;`-delimited `key=value` list.
///
/// Returns `""` when the key is absent or its value is empty. Keys must
/// match exactly, so `level-asymmetry-` does not find `level-asymmetry-allowed`.
pub fn extract_fmtp_value<'a>(fmtp: &'a str, key: &str) -> &'a str {
    fmtp.split(';')
        .filter_map(|entry| entry.trim().split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .unwrap_or("")
}

/// Value of `key` across a parameter list (each entry may itself hold `;`)
pub fn parameter_value<'a>(params: &'a [String], key: &str) -> &'a str {
    params
        .iter()
        .map(|p| extract_fmtp_value(p, key))
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

/// Join parameters into a single `fmtp` value
pub fn fmtps_string(params: &[String]) -> String {
    params.join(";")
}

fn decimal_or(params: &[String], key: &str, default: u32) -> u32 {
    parameter_value(params, key)
        .trim()
        .parse::<u32>()
        .unwrap_or(default)
}

/// H.264 `profile-level-id` (hex, optional `0x` prefix)
pub fn h264_profile_level_id(params: &[String]) -> u32 {
    let raw = parameter_value(params, "profile-level-id").trim();
    let hex = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u32::from_str_radix(hex, 16).unwrap_or(DEFAULT_PROFILE_LEVEL_ID)
}

/// H.264 `packetization-mode`, 0 when absent
pub fn h264_packetization_mode(params: &[String]) -> u32 {
    decimal_or(params, "packetization-mode", 0)
}

/// H.264 `level-asymmetry-allowed`, 0 when absent
pub fn h264_level_asymmetry_allowed(params: &[String]) -> u32 {
    decimal_or(params, "level-asymmetry-allowed", 0)
}

/// `profile_idc` byte of a profile-level-id
pub fn profile_id(profile_level_id: u32) -> u8 {
    ((profile_level_id >> 16) & 0xff) as u8
}

/// Constraint flags byte of a profile-level-id
pub fn constraint_flags(profile_level_id: u32) -> u8 {
    ((profile_level_id >> 8) & 0xff) as u8
}

/// `level_idc` byte of a profile-level-id
pub fn level_id(profile_level_id: u32) -> u8 {
    (profile_level_id & 0xff) as u8
}

/// H.265 `profile-id`, 1 (Main) when absent
pub fn h265_profile_id(params: &[String]) -> u32 {
    decimal_or(params, "profile-id", 1)
}

/// H.265 `tier-flag`, 0 (Main tier) when absent
pub fn h265_tier_flag(params: &[String]) -> u32 {
    decimal_or(params, "tier-flag", 0)
}

/// H.265 `level-id`, 1 when absent
pub fn h265_level_id(params: &[String]) -> u32 {
    decimal_or(params, "level-id", 1)
}

/// Whether two entries describe a compatible codec, payload type ignored
pub fn rtp_maps_match(a: &RtpMap, b: &RtpMap) -> bool {
    if !a.format().eq_ignore_ascii_case(b.format()) {
        return false;
    }
    match CodecId::from_format(a.format()) {
        Some(CodecId::H264) => {
            let (pa, pb) = (a.parameters(), b.parameters());
            if h264_packetization_mode(pa) != h264_packetization_mode(pb) {
                return false;
            }
            let asymmetry = h264_level_asymmetry_allowed(pa);
            if asymmetry != h264_level_asymmetry_allowed(pb) {
                return false;
            }
            let (ida, idb) = (h264_profile_level_id(pa), h264_profile_level_id(pb));
            if asymmetry == 0 {
                ida == idb
            } else {
                profile_id(ida) == profile_id(idb) && constraint_flags(ida) == constraint_flags(idb)
            }
        }
        Some(CodecId::H265) => {
            let (pa, pb) = (a.parameters(), b.parameters());
            h265_profile_id(pa) == h265_profile_id(pb) && h265_tier_flag(pa) == h265_tier_flag(pb)
        }
        Some(CodecId::Opus) => true,
        None => false,
    }
}

fn attach_ssrcs(
    media: &mut MediaDescription,
    cname: &str,
    stream_ids: &[String],
    track_id: Option<&str>,
) {
    if stream_ids.is_empty() {
        let mut binding = SsrcBinding::new(rand::random::<u32>());
        binding.cname = Some(cname.to_string());
        media.add_ssrc(binding);
        return;
    }
    for stream_id in stream_ids {
        let mut binding = SsrcBinding::new(rand::random::<u32>());
        binding.cname = Some(cname.to_string());
        binding.stream_id = Some(stream_id.clone());
        binding.track_id = track_id.map(str::to_string);
        media.add_ssrc(binding);
    }
}

fn require_media_kind(kind: MediaKind) -> RtcResult<()> {
    if kind.is_media() {
        Ok(())
    } else {
        Err(RtcError::UnsupportedMediaKind {
            kind: kind.to_string(),
        })
    }
}

/// Section announcing every locally supported codec of `kind`.
///
/// One fresh SSRC is bound per stream id (cname = `mid`), or a single
/// anonymous one when `stream_ids` is empty.
pub fn build_supported_media(
    mid: &str,
    direction: Direction,
    kind: MediaKind,
    stream_ids: &[String],
    track_id: Option<&str>,
) -> RtcResult<MediaDescription> {
    require_media_kind(kind)?;

    let mut media = MediaDescription::new(kind, mid, direction);
    media.add_attribute("rtcp-mux");
    for codec in supported_codecs(kind) {
        media.add_rtp_map(codec);
    }
    attach_ssrcs(&mut media, mid, stream_ids, track_id);
    Ok(media)
}

/// Answer section for the offer's section at `index`.
///
/// Offer payload types are walked in offer order; each one compatible with
/// a local codec is copied verbatim (number, parameters, feedback). Returns
/// `Ok(None)` when the offer has no media section at `index`.
pub fn negotiate_answer_media(
    offer: &SessionDescription,
    index: usize,
    direction: Direction,
    kind: MediaKind,
    stream_ids: &[String],
    track_id: Option<&str>,
) -> RtcResult<Option<MediaDescription>> {
    require_media_kind(kind)?;
    let offered = match offer.media(index) {
        Some(media) => media,
        None => {
            debug!("No media section at index {} in offer", index);
            return Ok(None);
        }
    };

    let mid = offered
        .mid()
        .map(str::to_string)
        .unwrap_or_else(|| index.to_string());
    let supported = supported_codecs(kind);

    let mut answer = MediaDescription::new(offered.kind(), mid.as_str(), direction);
    if offered.has_attribute("rtcp-mux") {
        answer.add_attribute("rtcp-mux");
    }
    for offered_map in offered.rtp_maps() {
        if supported.iter().any(|local| rtp_maps_match(offered_map, local)) {
            answer.add_rtp_map(offered_map.clone());
        }
    }
    attach_ssrcs(&mut answer, &mid, stream_ids, track_id);

    debug!(
        "Answer for mid {} accepts payload types {:?}",
        mid,
        answer.payload_types()
    );
    Ok(Some(answer))
}

/// The single codec used on the wire for `mid`.
///
/// Picks the offerer's first payload type the answerer also lists. The
/// offerer is whichever description is tagged `Offer`; when neither (or
/// both) is, the remote side is taken as the offerer. `None` means "not
/// negotiated yet".
pub fn negotiate_rtp_map(
    remote: &SessionDescription,
    local: &SessionDescription,
    mid: &str,
) -> Option<RtpMap> {
    let (offerer, answerer) =
        if local.sdp_type() == SdpType::Offer && remote.sdp_type() != SdpType::Offer {
            (local, remote)
        } else {
            (remote, local)
        };

    let offered = offerer.media_by_mid(mid)?;
    let accepted = answerer.media_by_mid(mid)?.payload_types();
    let payload_type = offered
        .payload_types()
        .into_iter()
        .find(|pt| accepted.contains(pt))?;

    let chosen = local
        .media_by_mid(mid)
        .and_then(|m| m.rtp_map(payload_type))
        .or_else(|| remote.media_by_mid(mid).and_then(|m| m.rtp_map(payload_type)))
        .cloned();
    if let Some(map) = &chosen {
        debug!("Negotiated {} for mid {}", map.rtpmap_value(), mid);
    }
    chosen
}
