//! RTP payload packetization
//!
//! Encoders hand over H.264/H.265 access units in Annex-B form (NAL units
//! separated by start codes). The packetizer turns one access unit into RTP
//! payloads no larger than the MTU, fragmenting oversized NAL units (FU-A
//! for H.264, FU type 49 for H.265). The depacketizer reverses this and
//! emits an Annex-B access unit whenever a packet carries the marker bit.
//!
//! Opus frames map one-to-one onto payloads.

use crate::error::{MediaError, MediaResult};
use bytes::{BufMut, Bytes, BytesMut};
use rtcpipe_core::CodecId;
use tracing::{debug, trace};

/// Annex-B start code written in front of every reassembled NAL unit
pub const START_CODE: [u8; 4] = [0, 0, 0, 1];

const H264_STAP_A: u8 = 24;
const H264_FU_A: u8 = 28;
const H265_AP: u8 = 48;
const H265_FU: u8 = 49;

const FU_START: u8 = 0x80;
const FU_END: u8 = 0x40;

/// Split an Annex-B byte stream into NAL units (start codes removed)
pub fn split_annex_b(data: &[u8]) -> Vec<&[u8]> {
    let mut starts = Vec::new();
    let mut i = 0;
    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            starts.push((i, i + 3));
            i += 3;
        } else {
            i += 1;
        }
    }
    if starts.is_empty() {
        return if data.is_empty() { Vec::new() } else { vec![data] };
    }

    let mut nals = Vec::with_capacity(starts.len());
    for (n, &(_, begin)) in starts.iter().enumerate() {
        let mut end = match starts.get(n + 1) {
            Some(&(next, _)) => next,
            None => data.len(),
        };
        // Trailing zero belongs to a four-byte start code
        while end > begin && data[end - 1] == 0 && n + 1 < starts.len() {
            end -= 1;
        }
        if end > begin {
            nals.push(&data[begin..end]);
        }
    }
    nals
}

fn codec_for(format: &str) -> MediaResult<CodecId> {
    CodecId::from_format(format).ok_or_else(|| MediaError::UnsupportedFormat {
        format: format.to_string(),
    })
}

/// Splits access units into RTP payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packetizer {
    codec: CodecId,
    mtu: usize,
}

impl Packetizer {
    /// Packetizer for an rtpmap format name such as `H264` or `opus`
    pub fn for_format(format: &str, mtu: usize) -> MediaResult<Self> {
        Self::for_codec(codec_for(format)?, mtu)
    }

    /// Packetizer for `codec` with payloads of at most `mtu` bytes
    pub fn for_codec(codec: CodecId, mtu: usize) -> MediaResult<Self> {
        // Room for the fragmentation headers plus at least one byte of data
        if mtu < 4 {
            return Err(MediaError::InvalidConfiguration {
                message: format!("MTU {} too small for RTP payloads", mtu),
            });
        }
        Ok(Self { codec, mtu })
    }

    /// Codec handled
    pub fn codec(&self) -> CodecId {
        self.codec
    }

    /// Maximum payload size
    pub fn mtu(&self) -> usize {
        self.mtu
    }

    /// Payloads for one access unit, in send order. The last carries the marker.
    pub fn packetize(&self, access_unit: &[u8]) -> Vec<Bytes> {
        match self.codec {
            CodecId::Opus => {
                if access_unit.is_empty() {
                    Vec::new()
                } else {
                    vec![Bytes::copy_from_slice(access_unit)]
                }
            }
            CodecId::H264 | CodecId::H265 => {
                let mut payloads = Vec::new();
                for nal in split_annex_b(access_unit) {
                    if nal.len() <= self.mtu {
                        payloads.push(Bytes::copy_from_slice(nal));
                    } else if self.codec == CodecId::H264 {
                        self.fragment_h264(nal, &mut payloads);
                    } else {
                        self.fragment_h265(nal, &mut payloads);
                    }
                }
                trace!("{} access unit -> {} payloads", self.codec, payloads.len());
                payloads
            }
        }
    }

    fn fragment_h264(&self, nal: &[u8], out: &mut Vec<Bytes>) {
        let indicator = (nal[0] & 0xE0) | H264_FU_A;
        let nal_type = nal[0] & 0x1F;
        let chunks: Vec<&[u8]> = nal[1..].chunks(self.mtu - 2).collect();
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut header = nal_type;
            if i == 0 {
                header |= FU_START;
            }
            if i == last {
                header |= FU_END;
            }
            let mut payload = BytesMut::with_capacity(chunk.len() + 2);
            payload.put_u8(indicator);
            payload.put_u8(header);
            payload.put_slice(chunk);
            out.push(payload.freeze());
        }
    }

    fn fragment_h265(&self, nal: &[u8], out: &mut Vec<Bytes>) {
        if nal.len() < 3 {
            out.push(Bytes::copy_from_slice(nal));
            return;
        }
        let nal_type = (nal[0] >> 1) & 0x3F;
        let header0 = (nal[0] & 0x81) | (H265_FU << 1);
        let header1 = nal[1];
        let chunks: Vec<&[u8]> = nal[2..].chunks(self.mtu - 3).collect();
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut fu_header = nal_type;
            if i == 0 {
                fu_header |= FU_START;
            }
            if i == last {
                fu_header |= FU_END;
            }
            let mut payload = BytesMut::with_capacity(chunk.len() + 3);
            payload.put_u8(header0);
            payload.put_u8(header1);
            payload.put_u8(fu_header);
            payload.put_slice(chunk);
            out.push(payload.freeze());
        }
    }
}

/// Reassembles RTP payloads into access units
#[derive(Debug)]
pub struct Depacketizer {
    codec: CodecId,
    access_unit: BytesMut,
    in_fragment: bool,
}

fn truncated(expected: usize, actual: usize) -> MediaError {
    MediaError::InvalidFrameData { expected, actual }
}

impl Depacketizer {
    /// Depacketizer for an rtpmap format name
    pub fn for_format(format: &str) -> MediaResult<Self> {
        Ok(Self::for_codec(codec_for(format)?))
    }

    /// Depacketizer for `codec`
    pub fn for_codec(codec: CodecId) -> Self {
        Self {
            codec,
            access_unit: BytesMut::new(),
            in_fragment: false,
        }
    }

    /// Codec handled
    pub fn codec(&self) -> CodecId {
        self.codec
    }

    /// Feed one payload. Returns the completed access unit when `marker` is
    /// set (Opus: on every payload).
    pub fn push(&mut self, payload: &[u8], marker: bool) -> MediaResult<Option<Bytes>> {
        match self.codec {
            CodecId::Opus => {
                return Ok(if payload.is_empty() {
                    None
                } else {
                    Some(Bytes::copy_from_slice(payload))
                })
            }
            CodecId::H264 => self.push_h264(payload)?,
            CodecId::H265 => self.push_h265(payload)?,
        }

        if marker && !self.access_unit.is_empty() {
            self.in_fragment = false;
            return Ok(Some(self.access_unit.split().freeze()));
        }
        Ok(None)
    }

    /// Discard a partially assembled access unit
    pub fn reset(&mut self) {
        self.access_unit.clear();
        self.in_fragment = false;
    }

    fn write_nal(&mut self, nal: &[u8]) {
        self.access_unit.put_slice(&START_CODE);
        self.access_unit.put_slice(nal);
    }

    fn write_aggregate(&mut self, mut body: &[u8]) -> MediaResult<()> {
        while !body.is_empty() {
            if body.len() < 2 {
                return Err(truncated(2, body.len()));
            }
            let size = u16::from_be_bytes([body[0], body[1]]) as usize;
            if body.len() < 2 + size {
                return Err(truncated(2 + size, body.len()));
            }
            self.write_nal(&body[2..2 + size]);
            body = &body[2 + size..];
        }
        Ok(())
    }

    fn push_h264(&mut self, payload: &[u8]) -> MediaResult<()> {
        if payload.is_empty() {
            return Err(truncated(1, 0));
        }
        match payload[0] & 0x1F {
            1..=23 => self.write_nal(payload),
            H264_STAP_A => self.write_aggregate(&payload[1..])?,
            H264_FU_A => {
                if payload.len() < 2 {
                    return Err(truncated(2, payload.len()));
                }
                let header = payload[1];
                if header & FU_START != 0 {
                    self.access_unit.put_slice(&START_CODE);
                    self.access_unit.put_u8((payload[0] & 0xE0) | (header & 0x1F));
                    self.in_fragment = true;
                } else if !self.in_fragment {
                    debug!("Dropping H.264 fragment without start");
                    return Ok(());
                }
                self.access_unit.put_slice(&payload[2..]);
                if header & FU_END != 0 {
                    self.in_fragment = false;
                }
            }
            other => debug!("Ignoring H.264 NAL type {}", other),
        }
        Ok(())
    }

    fn push_h265(&mut self, payload: &[u8]) -> MediaResult<()> {
        if payload.len() < 2 {
            return Err(truncated(2, payload.len()));
        }
        match (payload[0] >> 1) & 0x3F {
            H265_AP => self.write_aggregate(&payload[2..])?,
            H265_FU => {
                if payload.len() < 3 {
                    return Err(truncated(3, payload.len()));
                }
                let fu_header = payload[2];
                if fu_header & FU_START != 0 {
                    self.access_unit.put_slice(&START_CODE);
                    self.access_unit
                        .put_u8((payload[0] & 0x81) | ((fu_header & 0x3F) << 1));
                    self.access_unit.put_u8(payload[1]);
                    self.in_fragment = true;
                } else if !self.in_fragment {
                    debug!("Dropping H.265 fragment without start");
                    return Ok(());
                }
                self.access_unit.put_slice(&payload[3..]);
                if fu_header & FU_END != 0 {
                    self.in_fragment = false;
                }
            }
            _ => self.write_nal(payload),
        }
        Ok(())
    }
}
