//! Media engine
//!
//! Owns the frame pipe, the track registry and the codec factory shared by
//! every transceiver of an application. There are no process-wide
//! registries: two engines never see each other's channels or tracks.

use crate::config::EngineConfig;
use crate::transceiver::{RtpTrack, Transceiver};
use rtcpipe_core::{MediaKind, RtcError, RtcResult};
use rtcpipe_media::{
    CodecFactory, DefaultCodecFactory, FramePipe, MediaFrame, MediaTrack, SubscriptionId, TrackId,
    TrackRegistry,
};
use std::sync::Arc;
use tracing::info;

/// Entry point of the pipeline
///
/// # Example
/// ```rust
/// use rtcpipe::{EngineConfig, MediaEngine, MediaKind};
///
/// let engine = MediaEngine::new(EngineConfig::default())?;
/// let track = engine.create_track(MediaKind::Video)?;
/// engine.attach_track(track, "camera")?;
/// # Ok::<(), rtcpipe::RtcError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MediaEngine {
    config: Arc<EngineConfig>,
    pipe: Arc<FramePipe>,
    tracks: Arc<TrackRegistry>,
    codecs: Arc<dyn CodecFactory>,
}

impl MediaEngine {
    /// Engine with the bundled codecs
    pub fn new(config: EngineConfig) -> RtcResult<Self> {
        let codecs = Arc::new(DefaultCodecFactory::with_opus_config(config.opus));
        Self::with_codec_factory(config, codecs)
    }

    /// Engine using `codecs` to create encoders and decoders
    pub fn with_codec_factory(
        config: EngineConfig,
        codecs: Arc<dyn CodecFactory>,
    ) -> RtcResult<Self> {
        config.validate()?;
        let pipe = Arc::new(FramePipe::new());
        let tracks = Arc::new(TrackRegistry::with_config(
            Arc::clone(&pipe),
            config.video,
            config.audio,
        ));
        info!("Media engine created (mtu {})", config.mtu);

        Ok(Self {
            config: Arc::new(config),
            pipe,
            tracks,
            codecs,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Frame pipe of this engine
    pub fn pipe(&self) -> &Arc<FramePipe> {
        &self.pipe
    }

    /// Track registry of this engine
    pub fn tracks(&self) -> &Arc<TrackRegistry> {
        &self.tracks
    }

    /// Codec factory of this engine
    pub fn codecs(&self) -> &Arc<dyn CodecFactory> {
        &self.codecs
    }

    /// Create a track buffer for `kind`
    pub fn create_track(&self, kind: MediaKind) -> RtcResult<TrackId> {
        if !kind.is_media() {
            return Err(RtcError::UnsupportedMediaKind {
                kind: kind.to_string(),
            });
        }
        Ok(self.tracks.create(kind)?)
    }

    /// Feed frames published on `channel` into the track
    pub fn attach_track(&self, id: TrackId, channel: &str) -> RtcResult<()> {
        Ok(self.tracks.attach(id, channel)?)
    }

    /// Stop feeding the track and clear it
    pub fn detach_track(&self, id: TrackId) -> bool {
        self.tracks.detach(id)
    }

    /// Buffer handle of a track
    pub fn track(&self, id: TrackId) -> Option<MediaTrack> {
        self.tracks.get(id)
    }

    /// Remove a track
    pub fn erase_track(&self, id: TrackId) -> bool {
        self.tracks.erase(id)
    }

    /// Publish a frame (or end of stream) on `channel`
    pub fn publish(&self, channel: &str, frame: Option<&MediaFrame>) -> usize {
        self.pipe.publish(channel, frame)
    }

    /// Subscribe a callback to `channels`
    pub fn subscribe<I, S, F>(&self, channels: I, on_frame: F) -> SubscriptionId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, SubscriptionId, Option<&MediaFrame>) + Send + Sync + 'static,
    {
        self.pipe.subscribe(channels, on_frame)
    }

    /// Remove a subscription
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.pipe.unsubscribe(id)
    }

    /// Transceiver joining `track` to the given channels
    pub fn add_transceiver(
        &self,
        track: Arc<dyn RtpTrack>,
        send_channel: Option<&str>,
        recv_channel: Option<&str>,
    ) -> Transceiver {
        Transceiver::new(self, track, send_channel, recv_channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtcpipe_media::{PixelFormat, VideoFrame};

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            mtu: 10,
            ..EngineConfig::default()
        };
        assert!(MediaEngine::new(config).is_err());
    }

    #[test]
    fn test_engines_are_isolated() {
        let a = MediaEngine::new(EngineConfig::default()).unwrap();
        let b = MediaEngine::new(EngineConfig::default()).unwrap();
        a.subscribe(["cam"], |_, _, _| {});

        let frame = MediaFrame::from(VideoFrame::black(PixelFormat::Rgb24, 2, 2, 0));
        assert_eq!(a.publish("cam", Some(&frame)), 1);
        assert_eq!(b.publish("cam", Some(&frame)), 0);
    }

    #[test]
    fn test_application_track_rejected() {
        let engine = MediaEngine::new(EngineConfig::default()).unwrap();
        let err = engine.create_track(MediaKind::Application).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_MEDIA_KIND");
    }

    #[test]
    fn test_track_lifecycle() {
        let engine = MediaEngine::new(EngineConfig::default()).unwrap();
        let id = engine.create_track(MediaKind::Video).unwrap();
        engine.attach_track(id, "cam").unwrap();

        let frame = MediaFrame::from(VideoFrame::black(PixelFormat::Rgb24, 2, 2, 9));
        engine.publish("cam", Some(&frame));
        assert_eq!(engine.track(id).unwrap().len(), 1);

        assert!(engine.erase_track(id));
        assert!(engine.track(id).is_none());
        assert_eq!(engine.pipe().subscription_count(), 0);
    }
}
