//! Sample-accurate audio FIFO
//!
//! Frames go in with arbitrary sample counts and come out in fixed-size
//! chunks. The FIFO remembers the PTS of its first unread sample, so
//! consecutive reads carry gapless timestamps.

use crate::error::{MediaError, MediaResult};
use crate::frame::{AudioFormat, AudioFrame};
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub(crate) struct FifoQueue {
    format: Option<AudioFormat>,
    samples: VecDeque<f32>,
    base_pts: Option<i64>,
}

impl FifoQueue {
    pub(crate) fn with_format(format: AudioFormat) -> Self {
        Self {
            format: Some(format),
            ..Self::default()
        }
    }

    fn channels(&self) -> usize {
        self.format.map(|f| f.channels as usize).unwrap_or(1).max(1)
    }

    pub(crate) fn format(&self) -> Option<AudioFormat> {
        self.format
    }

    pub(crate) fn len(&self) -> usize {
        self.samples.len() / self.channels()
    }

    pub(crate) fn write(&mut self, frame: &AudioFrame) -> MediaResult<()> {
        match self.format {
            Some(format) if format != frame.format() => {
                return Err(MediaError::FormatMismatch {
                    expected: format.to_string(),
                    actual: frame.format().to_string(),
                })
            }
            Some(_) => {}
            None => self.format = Some(frame.format()),
        }
        if frame.nb_samples() == 0 {
            return Ok(());
        }
        if self.samples.is_empty() {
            self.base_pts = Some(frame.pts());
        }
        self.samples.extend(frame.to_f32_interleaved());
        Ok(())
    }

    pub(crate) fn read(&mut self, nb_samples: usize) -> MediaResult<Option<AudioFrame>> {
        let format = match self.format {
            Some(format) => format,
            None => return Ok(None),
        };
        if nb_samples == 0 || self.len() < nb_samples {
            return Ok(None);
        }

        let channels = self.channels();
        let data: Vec<f32> = self.samples.drain(..nb_samples * channels).collect();
        let pts = self.base_pts.unwrap_or(0);
        self.advance(nb_samples);
        AudioFrame::from_interleaved_as(format, &data, pts).map(Some)
    }

    pub(crate) fn discard(&mut self, nb_samples: usize) -> usize {
        let dropped = nb_samples.min(self.len());
        let channels = self.channels();
        self.samples.drain(..dropped * channels);
        self.advance(dropped);
        dropped
    }

    fn advance(&mut self, nb_samples: usize) {
        if self.samples.is_empty() {
            self.base_pts = None;
        } else if let Some(pts) = self.base_pts.as_mut() {
            *pts += nb_samples as i64;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.samples.clear();
        self.base_pts = None;
    }

    pub(crate) fn base_pts(&self) -> Option<i64> {
        self.base_pts
    }
}

/// Thread-safe audio FIFO.
///
/// Binds to the format of the first frame written unless created with
/// [`AudioFifo::with_format`]; frames in any other format are rejected.
#[derive(Debug, Default)]
pub struct AudioFifo {
    queue: Mutex<FifoQueue>,
}

impl AudioFifo {
    /// FIFO that binds to the first frame's format
    pub fn new() -> Self {
        Self::default()
    }

    /// FIFO bound to `format` up front
    pub fn with_format(format: AudioFormat) -> Self {
        Self {
            queue: Mutex::new(FifoQueue::with_format(format)),
        }
    }

    /// Append a frame. `None` is accepted and ignored.
    pub fn write(&self, frame: Option<&AudioFrame>) -> MediaResult<()> {
        match frame {
            Some(frame) => self.queue.lock().write(frame),
            None => Ok(()),
        }
    }

    /// Remove exactly `nb_samples` samples per channel from the front.
    ///
    /// Returns `None` until that many are buffered.
    pub fn read(&self, nb_samples: usize) -> MediaResult<Option<AudioFrame>> {
        self.queue.lock().read(nb_samples)
    }

    /// Drop up to `nb_samples` from the front, returning how many were dropped
    pub fn discard(&self, nb_samples: usize) -> usize {
        self.queue.lock().discard(nb_samples)
    }

    /// Buffered samples per channel
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bound format, if any
    pub fn format(&self) -> Option<AudioFormat> {
        self.queue.lock().format()
    }

    /// PTS of the first unread sample
    pub fn base_pts(&self) -> Option<i64> {
        self.queue.lock().base_pts()
    }

    /// Drop everything buffered; the bound format is kept
    pub fn clear(&self) {
        self.queue.lock().clear();
    }
}
