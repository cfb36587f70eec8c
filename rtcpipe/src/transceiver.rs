//! Transceiver wiring
//!
//! A [`Transceiver`] joins one negotiated RTP track of the transport to the
//! frame pipe. On the send side it listens on a channel, takes frames from
//! the track buffer attached to that channel, encodes them and hands the
//! access units to the transport. On the receive side the transport feeds
//! reassembled access units in through [`Transceiver::handle_incoming`];
//! they are decoded and every picture or audio frame is published on the
//! receive channel.
//!
//! Nothing is wired until [`Transceiver::on_open`] finds a codec both
//! descriptions agree on.

use crate::engine::MediaEngine;
use bytes::Bytes;
use parking_lot::Mutex;
use rtcpipe_core::{negotiate_rtp_map, CodecId, RtcError, RtcResult, RtpMap, SessionDescription};
use rtcpipe_media::{
    CodecFactory, Depacketizer, EncodedPacket, FramePipe, HookId, MediaFrame, MediaResult,
    MediaTrack, Packetizer, SubscriptionId, SyncDecoder, SyncEncoder, TrackRegistry,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Transport side of a transceiver: one RTP track of a peer connection
pub trait RtpTrack: Send + Sync {
    /// Media section id the track belongs to
    fn mid(&self) -> &str;

    /// Whether the track can currently send
    fn is_open(&self) -> bool;

    /// Packetizer to apply to outgoing access units
    fn set_packetizer(&self, packetizer: Packetizer);

    /// Depacketizer to apply to incoming RTP payloads
    fn set_depacketizer(&self, depacketizer: Depacketizer);

    /// Send one encoded access unit stamped with its RTP timestamp
    fn send_frame(&self, data: Bytes, timestamp: u32) -> RtcResult<()>;
}

#[derive(Default)]
struct Wiring {
    rtp_map: Option<RtpMap>,
    send_subscription: Option<SubscriptionId>,
    send_hook: Option<HookId>,
    decoder: Option<Arc<dyn SyncDecoder>>,
}

/// Glue between one RTP track and the frame pipe
pub struct Transceiver {
    pipe: Arc<FramePipe>,
    tracks: Arc<TrackRegistry>,
    codecs: Arc<dyn CodecFactory>,
    mtu: usize,
    track: Arc<dyn RtpTrack>,
    send_channel: Option<String>,
    recv_channel: Option<String>,
    wiring: Mutex<Wiring>,
    closed: Arc<AtomicBool>,
}

impl Transceiver {
    /// Transceiver for `track` using the engine's pipe, tracks and codecs.
    ///
    /// Either channel may be absent for a one-way track.
    pub fn new(
        engine: &MediaEngine,
        track: Arc<dyn RtpTrack>,
        send_channel: Option<&str>,
        recv_channel: Option<&str>,
    ) -> Self {
        Self {
            pipe: Arc::clone(engine.pipe()),
            tracks: Arc::clone(engine.tracks()),
            codecs: Arc::clone(engine.codecs()),
            mtu: engine.config().mtu,
            track,
            send_channel: send_channel.map(str::to_string),
            recv_channel: recv_channel.map(str::to_string),
            wiring: Mutex::new(Wiring::default()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Media section id of the underlying track
    pub fn mid(&self) -> &str {
        self.track.mid()
    }

    /// Codec agreed by the last successful [`on_open`](Self::on_open)
    pub fn negotiated_rtp_map(&self) -> Option<RtpMap> {
        self.wiring.lock().rtp_map.clone()
    }

    /// Whether a codec has been negotiated and the paths are wired
    pub fn is_wired(&self) -> bool {
        self.wiring.lock().rtp_map.is_some()
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wire the send and receive paths for the negotiated codec.
    ///
    /// Returns `Ok(false)` and wires nothing when the descriptions do not
    /// agree on a codec for this track's mid. Calling it again after a
    /// successful wiring replaces the previous one.
    pub fn on_open(
        &self,
        remote: &SessionDescription,
        local: &SessionDescription,
    ) -> RtcResult<bool> {
        if self.is_closed() {
            return Err(RtcError::InvalidState {
                expected: "open transceiver".to_string(),
                actual: "closed".to_string(),
            });
        }

        let mid = self.track.mid();
        let rtp_map = match negotiate_rtp_map(remote, local, mid) {
            Some(rtp_map) => rtp_map,
            None => {
                debug!("No common codec for mid {}, leaving track unwired", mid);
                return Ok(false);
            }
        };
        let codec = CodecId::from_rtp_map(&rtp_map).ok_or_else(|| RtcError::UnsupportedCodec {
            codec: rtp_map.format().to_string(),
        })?;

        // Build everything before touching the current wiring
        let sender = match &self.send_channel {
            Some(channel) => {
                let packetizer = Packetizer::for_format(rtp_map.format(), self.mtu)?;
                let encoder: Arc<dyn SyncEncoder> = Arc::from(self.codecs.encoder(codec)?);
                Some((channel.clone(), packetizer, encoder))
            }
            None => None,
        };
        let receiver = match &self.recv_channel {
            Some(_) => {
                let depacketizer = Depacketizer::for_format(rtp_map.format())?;
                let decoder: Arc<dyn SyncDecoder> = Arc::from(self.codecs.decoder(codec)?);
                Some((depacketizer, decoder))
            }
            None => None,
        };

        let mut wiring = self.wiring.lock();
        if wiring.send_subscription.is_some() {
            debug!("Rewiring mid {}, dropping the previous send path", mid);
        }
        self.unwire_sender(&mut wiring);

        if let Some((channel, packetizer, encoder)) = sender {
            self.track.set_packetizer(packetizer);
            self.wire_sender(&mut wiring, &channel, encoder);
        }
        wiring.decoder = match receiver {
            Some((depacketizer, decoder)) => {
                self.track.set_depacketizer(depacketizer);
                Some(decoder)
            }
            None => None,
        };

        info!(
            "Track {} wired with {} (send: {:?}, receive: {:?})",
            mid,
            rtp_map.rtpmap_value(),
            self.send_channel,
            self.recv_channel
        );
        wiring.rtp_map = Some(rtp_map);
        Ok(true)
    }

    /// Wire the send path for `channel`.
    ///
    /// Frames published while a track buffer is attached to the channel are
    /// sent from the registry hook, once the buffer holds them. Otherwise
    /// the pipe subscription encodes the published frame directly.
    fn wire_sender(&self, wiring: &mut Wiring, channel: &str, encoder: Arc<dyn SyncEncoder>) {
        let direct = {
            let track = Arc::clone(&self.track);
            let tracks = Arc::clone(&self.tracks);
            let closed = Arc::clone(&self.closed);
            let encoder = Arc::clone(&encoder);
            self.pipe.subscribe([channel], move |channel, _, frame| {
                if closed.load(Ordering::SeqCst) || tracks.channel_track(channel).is_some() {
                    return;
                }
                send_encoded(track.as_ref(), channel, encoder.encode(frame));
            })
        };

        let buffered = {
            let track = Arc::clone(&self.track);
            let closed = Arc::clone(&self.closed);
            self.tracks.on_buffered(channel, move |channel, buffered, frame| {
                if closed.load(Ordering::SeqCst) {
                    return;
                }
                send_encoded(
                    track.as_ref(),
                    channel,
                    drain_buffered(buffered, frame, encoder.as_ref()),
                );
            })
        };

        wiring.send_subscription = Some(direct);
        wiring.send_hook = Some(buffered);
    }

    fn unwire_sender(&self, wiring: &mut Wiring) {
        if let Some(subscription) = wiring.send_subscription.take() {
            self.pipe.unsubscribe(subscription);
        }
        if let Some(hook) = wiring.send_hook.take() {
            self.tracks.remove_hook(hook);
        }
    }

    /// Transport ingress: one reassembled access unit and its RTP timestamp.
    ///
    /// Ignored before wiring, after [`close`](Self::close), and on
    /// send-only transceivers.
    pub fn handle_incoming(&self, data: Bytes, timestamp: u32) -> RtcResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        let (decoder, channel) = match (&self.wiring.lock().decoder, &self.recv_channel) {
            (Some(decoder), Some(channel)) => (Arc::clone(decoder), channel.as_str()),
            _ => return Ok(()),
        };

        let packet = EncodedPacket::new(data, timestamp as i64);
        for frame in decoder.decode(Some(&packet))? {
            if self.is_closed() {
                break;
            }
            self.pipe.publish(channel, Some(&frame));
        }
        Ok(())
    }

    /// Tear down both paths. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut wiring = self.wiring.lock();
        self.unwire_sender(&mut wiring);
        wiring.decoder = None;
        debug!("Transceiver for mid {} closed", self.track.mid());
    }
}

impl Drop for Transceiver {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Transceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transceiver")
            .field("mid", &self.track.mid())
            .field("send_channel", &self.send_channel)
            .field("recv_channel", &self.recv_channel)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// RTP timestamps are 32 bits and wrap; keep the low bits of the PTS
fn rtp_timestamp(pts: i64) -> u32 {
    pts as u32
}

/// Hand encoded packets to the transport while it is open
fn send_encoded(track: &dyn RtpTrack, channel: &str, packets: MediaResult<Vec<EncodedPacket>>) {
    let packets = match packets {
        Ok(packets) => packets,
        Err(e) => {
            warn!("Encoding for {} failed: {}", channel, e);
            return;
        }
    };
    for packet in packets {
        if !track.is_open() {
            trace!("Track {} not open, dropping packet", track.mid());
            continue;
        }
        if let Err(e) = track.send_frame(packet.data, rtp_timestamp(packet.pts)) {
            warn!("Sending on {} failed: {}", track.mid(), e);
        }
    }
}

/// Encode everything `buffered` holds: every video frame in PTS order,
/// every complete audio chunk. End of stream then flushes the encoder.
fn drain_buffered(
    buffered: &MediaTrack,
    frame: Option<&MediaFrame>,
    encoder: &dyn SyncEncoder,
) -> MediaResult<Vec<EncodedPacket>> {
    let mut packets = Vec::new();
    while let Some(frame) = buffered.pop()? {
        packets.extend(encoder.encode(Some(&frame))?);
    }
    if frame.is_none() {
        packets.extend(encoder.encode(None)?);
    }
    Ok(packets)
}
