//! Per-track frame buffers
//!
//! Producers push from their callback thread, consumers pop on their own
//! schedule. Each buffer has one lock; buffers of different tracks never
//! contend. Neither buffer ever blocks a producer: when full they drop.

use crate::error::MediaResult;
use crate::fifo::FifoQueue;
use crate::frame::{AudioFormat, AudioFrame, PixelFormat, SampleFormat, VideoFrame};
use crate::resample::ResampleState;
use crate::scale::Scaler;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Format audio is held in between push and pop
pub const TRACK_AUDIO_FORMAT: AudioFormat = AudioFormat::new(SampleFormat::F32, 48_000, 2);

/// Video buffer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoBufferConfig {
    /// Frames held before the lowest-PTS frame is evicted
    pub capacity: usize,
    /// Drop frames older than the last popped one
    pub drop_late_frames: bool,
}

impl Default for VideoBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            drop_late_frames: false,
        }
    }
}

/// Audio buffer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioBufferConfig {
    /// Upper bound of buffered samples per channel (200 ms at 48 kHz)
    pub max_buffered_samples: usize,
    /// Samples per channel returned by each pop (20 ms at 48 kHz)
    pub frame_size: usize,
}

impl Default for AudioBufferConfig {
    fn default() -> Self {
        Self {
            max_buffered_samples: 9600,
            frame_size: 960,
        }
    }
}

struct QueuedFrame {
    pts: i64,
    seq: u64,
    frame: Arc<VideoFrame>,
}

impl PartialEq for QueuedFrame {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedFrame {}

impl PartialOrd for QueuedFrame {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedFrame {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.pts, self.seq).cmp(&(other.pts, other.seq))
    }
}

#[derive(Default)]
struct VideoQueue {
    heap: BinaryHeap<Reverse<QueuedFrame>>,
    seq: u64,
    last_popped: Option<i64>,
}

/// Reorder buffer popping video frames in ascending PTS order.
///
/// Holds at most `capacity` frames; pushing into a full buffer first
/// evicts the frame with the smallest PTS, even if that frame arrived last.
pub struct VideoTrackBuffer {
    config: VideoBufferConfig,
    queue: Mutex<VideoQueue>,
    scaler: Scaler,
}

impl VideoTrackBuffer {
    /// Buffer with default capacity
    pub fn new() -> Self {
        Self::with_config(VideoBufferConfig::default())
    }

    /// Buffer with explicit configuration
    pub fn with_config(config: VideoBufferConfig) -> Self {
        Self {
            config,
            queue: Mutex::new(VideoQueue::default()),
            scaler: Scaler::new(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> VideoBufferConfig {
        self.config
    }

    /// Insert a frame. `None` (end of stream) is ignored.
    pub fn push(&self, frame: Option<Arc<VideoFrame>>) {
        let frame = match frame {
            Some(frame) => frame,
            None => return,
        };
        let mut queue = self.queue.lock();

        if self.config.drop_late_frames {
            if let Some(last) = queue.last_popped {
                if frame.pts() < last {
                    debug!("Dropping late video frame pts={} (last popped {})", frame.pts(), last);
                    return;
                }
            }
        }
        if self.config.capacity > 0 && queue.heap.len() >= self.config.capacity {
            if let Some(Reverse(evicted)) = queue.heap.pop() {
                debug!("Video buffer full, evicting pts={}", evicted.pts);
            }
        }

        let seq = queue.seq;
        queue.seq += 1;
        queue.heap.push(Reverse(QueuedFrame {
            pts: frame.pts(),
            seq,
            frame,
        }));
    }

    /// Remove the frame with the smallest PTS
    pub fn pop(&self) -> Option<Arc<VideoFrame>> {
        let mut queue = self.queue.lock();
        let Reverse(entry) = queue.heap.pop()?;
        queue.last_popped = Some(entry.pts);
        trace!("Popped video frame pts={}", entry.pts);
        Some(entry.frame)
    }

    /// Pop and convert to `format`, keeping size and PTS
    pub fn pop_as(&self, format: PixelFormat) -> MediaResult<Option<Arc<VideoFrame>>> {
        match self.pop() {
            Some(frame) => {
                let (w, h) = (frame.width(), frame.height());
                self.scaler.scale(&frame, format, w, h).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Pop and convert to `format` at `width` x `height`, keeping PTS
    pub fn pop_scaled(
        &self,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> MediaResult<Option<Arc<VideoFrame>>> {
        match self.pop() {
            Some(frame) => self.scaler.scale(&frame, format, width, height).map(Some),
            None => Ok(None),
        }
    }

    /// Buffered frame count
    pub fn len(&self) -> usize {
        self.queue.lock().heap.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all buffered frames and forget the last popped PTS
    pub fn clear(&self) {
        let mut queue = self.queue.lock();
        queue.heap.clear();
        queue.last_popped = None;
    }
}

impl Default for VideoTrackBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VideoTrackBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoTrackBuffer")
            .field("config", &self.config)
            .field("len", &self.len())
            .finish()
    }
}

#[derive(Debug, Default)]
struct AudioPipeline {
    input: ResampleState,
    fifo: FifoQueue,
    output: ResampleState,
}

/// Audio accumulator holding float stereo at 48 kHz.
///
/// Pushed frames are converted on the way in; pops hand out fixed-size
/// chunks converted to whatever the consumer asks for. When the bound is
/// exceeded, the oldest samples are dropped (as many as the incoming frame
/// carries) so the newest audio always fits. A single frame longer than the
/// bound keeps only its last `max_buffered_samples` samples.
#[derive(Debug)]
pub struct AudioTrackBuffer {
    config: AudioBufferConfig,
    pipeline: Mutex<AudioPipeline>,
}

impl AudioTrackBuffer {
    /// Buffer with default bound and chunk size
    pub fn new() -> Self {
        Self::with_config(AudioBufferConfig::default())
    }

    /// Buffer with explicit configuration
    pub fn with_config(config: AudioBufferConfig) -> Self {
        Self {
            config,
            pipeline: Mutex::new(AudioPipeline {
                fifo: FifoQueue::with_format(TRACK_AUDIO_FORMAT),
                ..AudioPipeline::default()
            }),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> AudioBufferConfig {
        self.config
    }

    /// Append a frame in any format. `None` drains the input resampler.
    pub fn push(&self, frame: Option<&AudioFrame>) -> MediaResult<()> {
        let mut pipeline = self.pipeline.lock();
        let converted = match pipeline.input.resample(frame, TRACK_AUDIO_FORMAT)? {
            Some(converted) => converted,
            None => return Ok(()),
        };

        let max = self.config.max_buffered_samples;
        let converted = keep_newest(converted, max)?;
        let incoming = converted.nb_samples();
        if pipeline.fifo.len() + incoming > max {
            let dropped = pipeline.fifo.discard(incoming);
            debug!("Audio buffer full, dropped {} samples", dropped);
        }
        pipeline.fifo.write(&converted)
    }

    /// Pop one chunk converted to `format`/`sample_rate`/`channels`.
    ///
    /// `Ok(None)` until a full chunk is buffered. With a rate change the
    /// first chunks may come out short while the resampler fills.
    pub fn pop_audio(
        &self,
        format: SampleFormat,
        sample_rate: u32,
        channels: u16,
    ) -> MediaResult<Option<AudioFrame>> {
        let target = AudioFormat::new(format, sample_rate, channels);
        target.validate()?;
        let mut pipeline = self.pipeline.lock();
        let chunk = match pipeline.fifo.read(self.config.frame_size)? {
            Some(chunk) => chunk,
            None => return Ok(None),
        };
        if target == TRACK_AUDIO_FORMAT {
            return Ok(Some(chunk));
        }
        pipeline.output.resample(Some(&chunk), target)
    }

    /// Read `nb_samples` in the buffer's own format
    pub fn read(&self, nb_samples: usize) -> MediaResult<Option<AudioFrame>> {
        self.pipeline.lock().fifo.read(nb_samples)
    }

    /// Buffered samples per channel
    pub fn len(&self) -> usize {
        self.pipeline.lock().fifo.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// PTS of the next sample to be popped
    pub fn next_pts(&self) -> Option<i64> {
        self.pipeline.lock().fifo.base_pts()
    }

    /// Drop buffered samples and unbind both resamplers
    pub fn clear(&self) {
        let mut pipeline = self.pipeline.lock();
        pipeline.fifo.clear();
        pipeline.input = ResampleState::Unbound;
        pipeline.output = ResampleState::Unbound;
    }
}

impl Default for AudioTrackBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop the head of `frame` so at most `max` samples per channel remain
fn keep_newest(frame: AudioFrame, max: usize) -> MediaResult<AudioFrame> {
    let total = frame.nb_samples();
    if total <= max {
        return Ok(frame);
    }
    let skip = total - max;
    let channels = frame.format().channels as usize;
    let samples = frame.to_f32_interleaved();
    debug!("Audio frame longer than the buffer, dropped its first {} samples", skip);
    AudioFrame::from_interleaved_as(
        frame.format(),
        &samples[skip * channels..],
        frame.pts() + skip as i64,
    )
}
