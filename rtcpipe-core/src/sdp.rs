//! Session description model
//!
//! A small, lossless-enough SDP model covering what media negotiation needs:
//! media sections, their payload types and `rtpmap`/`fmtp`/`rtcp-fb`
//! attributes, SSRC bindings and direction. Attributes the model does not
//! interpret are kept verbatim so that `parse(generate(x))` reproduces the
//! same content.

use crate::error::{RtcError, RtcResult};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const CRLF: &str = "\r\n";

/// Offer/answer role of a session description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdpType {
    /// Description produced by the offerer
    Offer,
    /// Description produced by the answerer
    Answer,
}

impl SdpType {
    /// Lowercase wire name (`offer` / `answer`)
    pub fn as_str(&self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
        }
    }
}

impl FromStr for SdpType {
    type Err = RtcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "offer" => Ok(SdpType::Offer),
            "answer" => Ok(SdpType::Answer),
            other => Err(RtcError::InvalidArgument {
                reason: format!("unknown description type '{}'", other),
            }),
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media flow direction of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Local side only sends
    SendOnly,
    /// Local side only receives
    RecvOnly,
    /// Both directions
    #[default]
    SendRecv,
    /// No media flows
    Inactive,
}

impl Direction {
    /// Attribute name used on the wire
    pub fn as_attribute(&self) -> &'static str {
        match self {
            Direction::SendOnly => "sendonly",
            Direction::RecvOnly => "recvonly",
            Direction::SendRecv => "sendrecv",
            Direction::Inactive => "inactive",
        }
    }

    /// Parse a direction attribute, `None` for any other attribute
    pub fn from_attribute(attr: &str) -> Option<Self> {
        match attr {
            "sendonly" => Some(Direction::SendOnly),
            "recvonly" => Some(Direction::RecvOnly),
            "sendrecv" => Some(Direction::SendRecv),
            "inactive" => Some(Direction::Inactive),
            _ => None,
        }
    }

    /// Direction as seen from the remote side
    pub fn reverse(&self) -> Self {
        match self {
            Direction::SendOnly => Direction::RecvOnly,
            Direction::RecvOnly => Direction::SendOnly,
            other => *other,
        }
    }

    /// Whether the local side sends media
    pub fn sends(&self) -> bool {
        matches!(self, Direction::SendOnly | Direction::SendRecv)
    }

    /// Whether the local side receives media
    pub fn receives(&self) -> bool {
        matches!(self, Direction::RecvOnly | Direction::SendRecv)
    }
}

impl FromStr for Direction {
    type Err = RtcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::from_attribute(&s.to_ascii_lowercase()).ok_or_else(|| RtcError::InvalidArgument {
            reason: format!("unknown direction '{}'", s),
        })
    }
}

/// Kind of a media section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Audio RTP section
    Audio,
    /// Video RTP section
    Video,
    /// Data channel section
    Application,
}

impl MediaKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Application => "application",
        }
    }

    /// Whether sections of this kind carry RTP media
    pub fn is_media(&self) -> bool {
        !matches!(self, MediaKind::Application)
    }
}

impl FromStr for MediaKind {
    type Err = RtcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            "application" => Ok(MediaKind::Application),
            other => Err(RtcError::UnsupportedMediaKind {
                kind: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One codec entry of a media section (`a=rtpmap` plus its `fmtp` and `rtcp-fb`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpMap {
    payload_type: u8,
    format: String,
    clock_rate: u32,
    encoding_params: Option<String>,
    parameters: Vec<String>,
    feedback: Vec<String>,
}

impl RtpMap {
    /// Create an entry without parameters
    pub fn new(payload_type: u8, format: impl Into<String>, clock_rate: u32) -> Self {
        Self {
            payload_type,
            format: format.into(),
            clock_rate,
            encoding_params: None,
            parameters: Vec::new(),
            feedback: Vec::new(),
        }
    }

    /// Set encoding parameters (channel count for audio)
    pub fn with_encoding_params(mut self, params: impl Into<String>) -> Self {
        self.encoding_params = Some(params.into());
        self
    }

    /// Append `key=value` format parameters
    pub fn with_parameters<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters.extend(params.into_iter().map(Into::into));
        self
    }

    /// Append RTCP feedback values (`nack`, `nack pli`, ...)
    pub fn with_feedback<I, S>(mut self, feedback: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feedback.extend(feedback.into_iter().map(Into::into));
        self
    }

    /// Same entry renumbered to another payload type
    pub fn with_payload_type(mut self, payload_type: u8) -> Self {
        self.payload_type = payload_type;
        self
    }

    /// Payload type number
    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    /// Codec name as written in the description
    pub fn format(&self) -> &str {
        &self.format
    }

    /// RTP clock rate
    pub fn clock_rate(&self) -> u32 {
        self.clock_rate
    }

    /// Encoding parameters, if any
    pub fn encoding_params(&self) -> Option<&str> {
        self.encoding_params.as_deref()
    }

    /// Format parameters in their original order
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// RTCP feedback values
    pub fn feedback(&self) -> &[String] {
        &self.feedback
    }

    /// Value part of the `a=rtpmap:` attribute
    pub fn rtpmap_value(&self) -> String {
        match &self.encoding_params {
            Some(params) => format!(
                "{} {}/{}/{}",
                self.payload_type, self.format, self.clock_rate, params
            ),
            None => format!("{} {}/{}", self.payload_type, self.format, self.clock_rate),
        }
    }

    fn parse(value: &str, line: usize) -> RtcResult<Self> {
        let (pt, encoding) = value
            .split_once(' ')
            .ok_or_else(|| RtcError::sdp(line, "rtpmap without encoding"))?;
        let payload_type = parse_payload_type(pt, line)?;
        let mut parts = encoding.trim().splitn(3, '/');
        let format = parts
            .next()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| RtcError::sdp(line, "rtpmap without format"))?;
        let clock_rate = parts
            .next()
            .and_then(|c| c.trim().parse::<u32>().ok())
            .ok_or_else(|| RtcError::sdp(line, "rtpmap without valid clock rate"))?;

        let mut map = RtpMap::new(payload_type, format, clock_rate);
        map.encoding_params = parts.next().map(|p| p.trim().to_string());
        Ok(map)
    }
}

/// SSRC announced in a media section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsrcBinding {
    /// Synchronization source
    pub ssrc: u32,
    /// `cname` attribute
    pub cname: Option<String>,
    /// Media stream id from `msid`
    pub stream_id: Option<String>,
    /// Track id from `msid`
    pub track_id: Option<String>,
    /// Other `a=ssrc:<ssrc> <attr>` values, verbatim
    pub extra: Vec<String>,
}

impl SsrcBinding {
    /// Binding with only an SSRC
    pub fn new(ssrc: u32) -> Self {
        Self {
            ssrc,
            cname: None,
            stream_id: None,
            track_id: None,
            extra: Vec::new(),
        }
    }

    fn write_to(&self, out: &mut String) {
        if let Some(cname) = &self.cname {
            push_line(out, &format!("a=ssrc:{} cname:{}", self.ssrc, cname));
        }
        if let Some(stream) = &self.stream_id {
            match &self.track_id {
                Some(track) => push_line(
                    out,
                    &format!("a=ssrc:{} msid:{} {}", self.ssrc, stream, track),
                ),
                None => push_line(out, &format!("a=ssrc:{} msid:{}", self.ssrc, stream)),
            }
        }
        for extra in &self.extra {
            push_line(out, &format!("a=ssrc:{} {}", self.ssrc, extra));
        }
        if self.cname.is_none() && self.stream_id.is_none() && self.extra.is_empty() {
            push_line(out, &format!("a=ssrc:{}", self.ssrc));
        }
    }
}

/// One `m=` section of a session description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescription {
    kind: MediaKind,
    port: u16,
    protocol: String,
    formats: Vec<String>,
    connection: Option<String>,
    mid: Option<String>,
    direction: Direction,
    rtp_maps: Vec<RtpMap>,
    ssrcs: Vec<SsrcBinding>,
    extra_lines: Vec<String>,
}

impl MediaDescription {
    /// Empty section of the given kind
    pub fn new(kind: MediaKind, mid: impl Into<String>, direction: Direction) -> Self {
        Self {
            kind,
            port: 9,
            protocol: "UDP/TLS/RTP/SAVPF".to_string(),
            formats: Vec::new(),
            connection: Some("IN IP4 0.0.0.0".to_string()),
            mid: Some(mid.into()),
            direction,
            rtp_maps: Vec::new(),
            ssrcs: Vec::new(),
            extra_lines: Vec::new(),
        }
    }

    /// Section kind
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Port from the `m=` line
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Transport protocol from the `m=` line
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Media identifier
    pub fn mid(&self) -> Option<&str> {
        self.mid.as_deref()
    }

    /// Flow direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Change the flow direction
    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Payload types in `m=` line order
    pub fn payload_types(&self) -> Vec<u8> {
        self.formats
            .iter()
            .filter_map(|f| f.parse::<u8>().ok())
            .collect()
    }

    /// Codec entry for a payload type
    pub fn rtp_map(&self, payload_type: u8) -> Option<&RtpMap> {
        self.rtp_maps
            .iter()
            .find(|m| m.payload_type() == payload_type)
    }

    /// Codec entries in `m=` line order
    pub fn rtp_maps(&self) -> Vec<&RtpMap> {
        self.payload_types()
            .into_iter()
            .filter_map(|pt| self.rtp_map(pt))
            .collect()
    }

    /// Append a codec entry; its payload type is appended to the `m=` line
    pub fn add_rtp_map(&mut self, map: RtpMap) {
        let pt = map.payload_type().to_string();
        if !self.formats.contains(&pt) {
            self.formats.push(pt);
        }
        self.rtp_maps.retain(|m| m.payload_type() != map.payload_type());
        self.rtp_maps.push(map);
    }

    /// SSRC bindings
    pub fn ssrcs(&self) -> &[SsrcBinding] {
        &self.ssrcs
    }

    /// Add an SSRC binding
    pub fn add_ssrc(&mut self, binding: SsrcBinding) {
        self.ssrcs.push(binding);
    }

    /// Uninterpreted lines of the section, verbatim
    pub fn extra_lines(&self) -> &[String] {
        &self.extra_lines
    }

    /// Add an uninterpreted attribute, e.g. `rtcp-mux`
    pub fn add_attribute(&mut self, attribute: impl AsRef<str>) {
        self.extra_lines.push(format!("a={}", attribute.as_ref()));
    }

    /// Whether an attribute line (`a=<name>` or `a=<name>:...`) is present
    pub fn has_attribute(&self, name: &str) -> bool {
        self.extra_lines.iter().any(|line| {
            line.strip_prefix("a=")
                .map(|attr| attr == name || attr.starts_with(&format!("{}:", name)))
                .unwrap_or(false)
        })
    }

    /// Wire text of this section only, CRLF-terminated
    pub fn generate_sdp(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        let mut mline = format!("m={} {} {}", self.kind, self.port, self.protocol);
        for format in &self.formats {
            mline.push(' ');
            mline.push_str(format);
        }
        push_line(out, &mline);
        if let Some(connection) = &self.connection {
            push_line(out, &format!("c={}", connection));
        }
        if let Some(mid) = &self.mid {
            push_line(out, &format!("a=mid:{}", mid));
        }
        if self.kind.is_media() {
            push_line(out, &format!("a={}", self.direction.as_attribute()));
        }
        for line in &self.extra_lines {
            push_line(out, line);
        }
        for map in self.rtp_maps() {
            push_line(out, &format!("a=rtpmap:{}", map.rtpmap_value()));
            if !map.parameters().is_empty() {
                push_line(
                    out,
                    &format!("a=fmtp:{} {}", map.payload_type(), map.parameters().join(";")),
                );
            }
            for fb in map.feedback() {
                push_line(out, &format!("a=rtcp-fb:{} {}", map.payload_type(), fb));
            }
        }
        for ssrc in &self.ssrcs {
            ssrc.write_to(out);
        }
    }
}

/// Full session description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    sdp_type: SdpType,
    origin: String,
    session_name: String,
    timing: String,
    session_lines: Vec<String>,
    media: Vec<MediaDescription>,
}

impl SessionDescription {
    /// Empty description of the given type
    pub fn new(sdp_type: SdpType) -> Self {
        Self {
            sdp_type,
            origin: "- 0 0 IN IP4 127.0.0.1".to_string(),
            session_name: "-".to_string(),
            timing: "0 0".to_string(),
            session_lines: Vec::new(),
            media: Vec::new(),
        }
    }

    /// Parse SDP text. Accepts both CRLF and bare LF line endings.
    pub fn parse(text: &str, sdp_type: SdpType) -> RtcResult<Self> {
        let mut desc = SessionDescription::new(sdp_type);
        let mut current: Option<SectionBuilder> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = split_line(line, line_no)?;

            if key == 'm' {
                if let Some(section) = current.take() {
                    desc.media.push(section.finish());
                }
                current = Some(SectionBuilder::start(value, line_no)?);
                continue;
            }

            match current.as_mut() {
                Some(section) => section.line(key, value, line, line_no)?,
                None => match key {
                    'v' => {}
                    'o' => desc.origin = value.to_string(),
                    's' => desc.session_name = value.to_string(),
                    't' => desc.timing = value.to_string(),
                    _ => desc.session_lines.push(line.to_string()),
                },
            }
        }
        if let Some(section) = current.take() {
            desc.media.push(section.finish());
        }
        Ok(desc)
    }

    /// Offer/answer role
    pub fn sdp_type(&self) -> SdpType {
        self.sdp_type
    }

    /// All sections, including data channel sections
    pub fn sections(&self) -> &[MediaDescription] {
        &self.media
    }

    /// Media section at `index`; absent for data channel sections
    pub fn media(&self, index: usize) -> Option<&MediaDescription> {
        self.media.get(index).filter(|m| m.kind().is_media())
    }

    /// Media section carrying `mid`
    pub fn media_by_mid(&self, mid: &str) -> Option<&MediaDescription> {
        self.media
            .iter()
            .filter(|m| m.kind().is_media())
            .find(|m| m.mid() == Some(mid))
    }

    /// Number of sections
    pub fn section_count(&self) -> usize {
        self.media.len()
    }

    /// Append a section
    pub fn add_media(&mut self, media: MediaDescription) {
        self.media.push(media);
    }

    /// Add a session-level attribute, e.g. `group:BUNDLE 0 1`
    pub fn add_attribute(&mut self, attribute: impl AsRef<str>) {
        self.session_lines.push(format!("a={}", attribute.as_ref()));
    }

    /// Wire text, CRLF-terminated
    pub fn generate(&self) -> String {
        let mut out = String::new();
        push_line(&mut out, "v=0");
        push_line(&mut out, &format!("o={}", self.origin));
        push_line(&mut out, &format!("s={}", self.session_name));
        push_line(&mut out, &format!("t={}", self.timing));
        for line in &self.session_lines {
            push_line(&mut out, line);
        }
        for media in &self.media {
            media.write_to(&mut out);
        }
        out
    }
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.generate())
    }
}

/// Accumulates one section while parsing. `fmtp`/`rtcp-fb` are attached at
/// the end so that they may precede their `rtpmap`.
struct SectionBuilder {
    media: MediaDescription,
    fmtp: HashMap<u8, Vec<String>>,
    feedback: HashMap<u8, Vec<String>>,
    orphans: Vec<(u8, String)>,
}

impl SectionBuilder {
    fn start(mline: &str, line_no: usize) -> RtcResult<Self> {
        let mut parts = mline.split_whitespace();
        let kind = parts
            .next()
            .ok_or_else(|| RtcError::sdp(line_no, "empty m-line"))?
            .parse::<MediaKind>()
            .map_err(|e| RtcError::sdp(line_no, e.to_string()))?;
        let port = parts
            .next()
            .and_then(|p| p.split('/').next())
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(|| RtcError::sdp(line_no, "m-line without valid port"))?;
        let protocol = parts
            .next()
            .ok_or_else(|| RtcError::sdp(line_no, "m-line without protocol"))?
            .to_string();
        let formats: Vec<String> = parts.map(str::to_string).collect();
        if kind.is_media() {
            for format in &formats {
                parse_payload_type(format, line_no)?;
            }
        }

        Ok(Self {
            media: MediaDescription {
                kind,
                port,
                protocol,
                formats,
                connection: None,
                mid: None,
                direction: Direction::default(),
                rtp_maps: Vec::new(),
                ssrcs: Vec::new(),
                extra_lines: Vec::new(),
            },
            fmtp: HashMap::new(),
            feedback: HashMap::new(),
            orphans: Vec::new(),
        })
    }

    fn line(&mut self, key: char, value: &str, raw: &str, line_no: usize) -> RtcResult<()> {
        if key == 'c' {
            self.media.connection = Some(value.to_string());
            return Ok(());
        }
        if key != 'a' {
            self.media.extra_lines.push(raw.to_string());
            return Ok(());
        }

        let (name, arg) = match value.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (value, None),
        };
        match (name, arg) {
            ("mid", Some(mid)) => self.media.mid = Some(mid.to_string()),
            ("rtpmap", Some(arg)) if self.media.kind.is_media() => {
                let map = RtpMap::parse(arg, line_no)?;
                self.media
                    .rtp_maps
                    .retain(|m| m.payload_type() != map.payload_type());
                self.media.rtp_maps.push(map);
            }
            ("fmtp", Some(arg)) if self.media.kind.is_media() => {
                let (pt, params) = arg.split_once(' ').unwrap_or((arg, ""));
                let pt = parse_payload_type(pt, line_no)?;
                self.fmtp.entry(pt).or_default().extend(
                    params
                        .split(';')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(str::to_string),
                );
            }
            ("rtcp-fb", Some(arg)) if self.media.kind.is_media() => {
                let (pt, fb) = arg.split_once(' ').unwrap_or((arg, ""));
                match pt.parse::<u8>() {
                    Ok(pt) if pt <= 127 => self
                        .feedback
                        .entry(pt)
                        .or_default()
                        .push(fb.trim().to_string()),
                    _ => self.media.extra_lines.push(raw.to_string()),
                }
            }
            ("ssrc", Some(arg)) => self.ssrc(arg, line_no)?,
            (attr, None) if Direction::from_attribute(attr).is_some() => {
                self.media.direction = Direction::from_attribute(attr).unwrap_or_default();
            }
            _ => self.media.extra_lines.push(raw.to_string()),
        }
        Ok(())
    }

    fn ssrc(&mut self, arg: &str, line_no: usize) -> RtcResult<()> {
        let (ssrc, attr) = arg.split_once(' ').unwrap_or((arg, ""));
        let ssrc = ssrc
            .parse::<u32>()
            .map_err(|_| RtcError::sdp(line_no, format!("invalid ssrc '{}'", ssrc)))?;
        let idx = match self.media.ssrcs.iter().position(|b| b.ssrc == ssrc) {
            Some(idx) => idx,
            None => {
                self.media.ssrcs.push(SsrcBinding::new(ssrc));
                self.media.ssrcs.len() - 1
            }
        };
        let binding = &mut self.media.ssrcs[idx];

        let attr = attr.trim();
        if let Some(cname) = attr.strip_prefix("cname:") {
            binding.cname = Some(cname.to_string());
        } else if let Some(msid) = attr.strip_prefix("msid:") {
            let mut ids = msid.split_whitespace();
            binding.stream_id = ids.next().map(str::to_string);
            binding.track_id = ids.next().map(str::to_string);
        } else if !attr.is_empty() {
            binding.extra.push(attr.to_string());
        }
        Ok(())
    }

    fn finish(mut self) -> MediaDescription {
        for map in self.media.rtp_maps.iter_mut() {
            if let Some(params) = self.fmtp.remove(&map.payload_type) {
                map.parameters.extend(params);
            }
            if let Some(fb) = self.feedback.remove(&map.payload_type) {
                map.feedback.extend(fb);
            }
        }
        for (pt, params) in self.fmtp.drain() {
            self.orphans.push((pt, format!("a=fmtp:{} {}", pt, params.join(";"))));
        }
        for (pt, fbs) in self.feedback.drain() {
            for fb in fbs {
                self.orphans.push((pt, format!("a=rtcp-fb:{} {}", pt, fb)));
            }
        }
        self.orphans.sort();
        self.media
            .extra_lines
            .extend(self.orphans.into_iter().map(|(_, line)| line));
        self.media
    }
}

fn split_line(line: &str, line_no: usize) -> RtcResult<(char, &str)> {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(key), Some('=')) if key.is_ascii_alphabetic() => Ok((key, &line[2..])),
        _ => Err(RtcError::sdp(line_no, format!("malformed line '{}'", line))),
    }
}

fn parse_payload_type(value: &str, line_no: usize) -> RtcResult<u8> {
    match value.trim().parse::<u8>() {
        Ok(pt) if pt <= 127 => Ok(pt),
        _ => Err(RtcError::sdp(
            line_no,
            format!("invalid payload type '{}'", value),
        )),
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str(CRLF);
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFER: &str = "v=0\r\n\
o=- 4615 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 109\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:0\r\n\
a=sendrecv\r\n\
a=rtcp-mux\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtcp-fb:96 nack\r\n\
a=rtpmap:109 H264/90000\r\n\
a=fmtp:109 profile-level-id=42e01f;packetization-mode=1\r\n\
a=ssrc:1234 cname:0\r\n\
a=ssrc:1234 msid:stream track\r\n\
m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:1\r\n\
a=sctp-port:5000\r\n";

    #[test]
    fn test_parse_sections() {
        let desc = SessionDescription::parse(OFFER, SdpType::Offer).unwrap();
        assert_eq!(desc.section_count(), 2);

        let video = desc.media(0).unwrap();
        assert_eq!(video.kind(), MediaKind::Video);
        assert_eq!(video.mid(), Some("0"));
        assert_eq!(video.payload_types(), vec![96, 109]);
        assert_eq!(video.rtp_map(96).unwrap().feedback(), ["nack".to_string()]);
        assert_eq!(
            video.rtp_map(109).unwrap().parameters(),
            ["profile-level-id=42e01f".to_string(), "packetization-mode=1".to_string()]
        );
        assert_eq!(video.ssrcs()[0].stream_id.as_deref(), Some("stream"));
        assert!(video.has_attribute("rtcp-mux"));

        assert!(desc.media(1).is_none());
        assert_eq!(desc.sections()[1].kind(), MediaKind::Application);
    }

    #[test]
    fn test_round_trip() {
        let desc = SessionDescription::parse(OFFER, SdpType::Offer).unwrap();
        let again = SessionDescription::parse(&desc.generate(), SdpType::Offer).unwrap();
        assert_eq!(desc, again);
    }

    #[test]
    fn test_fmtp_before_rtpmap() {
        let text = "m=audio 9 UDP/TLS/RTP/SAVPF 111\na=fmtp:111 minptime=10\na=rtpmap:111 opus/48000/2\n";
        let desc = SessionDescription::parse(text, SdpType::Answer).unwrap();
        let opus = desc.media(0).unwrap().rtp_map(111).unwrap();
        assert_eq!(opus.encoding_params(), Some("2"));
        assert_eq!(opus.parameters(), ["minptime=10".to_string()]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(SessionDescription::parse("m=video 9 RTP/AVP 300\r\n", SdpType::Offer).is_err());
        assert!(SessionDescription::parse("m=text 9 RTP/AVP 96\r\n", SdpType::Offer).is_err());
        assert!(SessionDescription::parse("garbage\r\n", SdpType::Offer).is_err());
        assert!(SessionDescription::parse(
            "m=video 9 RTP/AVP 96\r\na=rtpmap:96 H264\r\n",
            SdpType::Offer
        )
        .is_err());
    }

    #[test]
    fn test_direction_helpers() {
        assert_eq!(Direction::SendOnly.reverse(), Direction::RecvOnly);
        assert!(Direction::SendRecv.sends() && Direction::SendRecv.receives());
        assert!(!Direction::Inactive.sends());
        assert_eq!("recvonly".parse::<Direction>().unwrap(), Direction::RecvOnly);
    }
}
