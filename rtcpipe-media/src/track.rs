//! Media tracks
//!
//! A track is a buffer of one media kind. The set of kinds is closed, so
//! tracks are a tagged variant rather than trait objects.

use crate::buffer::{AudioBufferConfig, AudioTrackBuffer, VideoBufferConfig, VideoTrackBuffer};
use crate::error::{MediaError, MediaResult};
use crate::frame::{AudioFrame, MediaFrame, PixelFormat, SampleFormat, VideoFrame};
use rtcpipe_core::MediaKind;
use std::sync::Arc;

/// Buffer of a video or audio track. Cloning shares the buffer.
#[derive(Debug, Clone)]
pub enum MediaTrack {
    /// Video reorder buffer
    Video(Arc<VideoTrackBuffer>),
    /// Audio FIFO
    Audio(Arc<AudioTrackBuffer>),
}

impl MediaTrack {
    /// Track of `kind` with default buffer settings
    pub fn new(kind: MediaKind) -> MediaResult<Self> {
        Self::with_config(kind, VideoBufferConfig::default(), AudioBufferConfig::default())
    }

    /// Track of `kind`; only the config matching the kind is used
    pub fn with_config(
        kind: MediaKind,
        video: VideoBufferConfig,
        audio: AudioBufferConfig,
    ) -> MediaResult<Self> {
        match kind {
            MediaKind::Video => Ok(MediaTrack::Video(Arc::new(VideoTrackBuffer::with_config(video)))),
            MediaKind::Audio => Ok(MediaTrack::Audio(Arc::new(AudioTrackBuffer::with_config(audio)))),
            MediaKind::Application => Err(MediaError::InvalidMediaType {
                expected: "audio or video".to_string(),
                actual: kind.to_string(),
            }),
        }
    }

    /// Kind of the track
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaTrack::Video(_) => MediaKind::Video,
            MediaTrack::Audio(_) => MediaKind::Audio,
        }
    }

    fn mismatch(&self, actual: MediaKind) -> MediaError {
        MediaError::InvalidMediaType {
            expected: self.kind().to_string(),
            actual: actual.to_string(),
        }
    }

    /// Push a frame of the track's kind; `None` is passed through as a flush
    pub fn push(&self, frame: Option<&MediaFrame>) -> MediaResult<()> {
        match (self, frame) {
            (MediaTrack::Video(buffer), Some(MediaFrame::Video(v))) => {
                buffer.push(Some(Arc::clone(v)));
                Ok(())
            }
            (MediaTrack::Video(buffer), None) => {
                buffer.push(None);
                Ok(())
            }
            (MediaTrack::Audio(buffer), Some(MediaFrame::Audio(a))) => buffer.push(Some(a.as_ref())),
            (MediaTrack::Audio(buffer), None) => buffer.push(None),
            (_, Some(other)) => Err(self.mismatch(other.kind())),
        }
    }

    /// Pop the next video frame converted to `format`
    pub fn pop_video(&self, format: PixelFormat) -> MediaResult<Option<Arc<VideoFrame>>> {
        match self {
            MediaTrack::Video(buffer) => buffer.pop_as(format),
            MediaTrack::Audio(_) => Err(self.mismatch(MediaKind::Video)),
        }
    }

    /// Pop the next audio chunk converted to the given layout
    pub fn pop_audio(
        &self,
        format: SampleFormat,
        sample_rate: u32,
        channels: u16,
    ) -> MediaResult<Option<AudioFrame>> {
        match self {
            MediaTrack::Audio(buffer) => buffer.pop_audio(format, sample_rate, channels),
            MediaTrack::Video(_) => Err(self.mismatch(MediaKind::Audio)),
        }
    }

    /// Pop whatever the track holds next, in its native buffered format
    pub fn pop(&self) -> MediaResult<Option<MediaFrame>> {
        match self {
            MediaTrack::Video(buffer) => Ok(buffer.pop().map(MediaFrame::Video)),
            MediaTrack::Audio(buffer) => Ok(buffer
                .read(buffer.config().frame_size)?
                .map(|a| MediaFrame::Audio(Arc::new(a)))),
        }
    }

    /// Drop everything buffered
    pub fn clear(&self) {
        match self {
            MediaTrack::Video(buffer) => buffer.clear(),
            MediaTrack::Audio(buffer) => buffer.clear(),
        }
    }

    /// Buffered frames (video) or samples per channel (audio)
    pub fn len(&self) -> usize {
        match self {
            MediaTrack::Video(buffer) => buffer.len(),
            MediaTrack::Audio(buffer) => buffer.len(),
        }
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
