//! Audio sample format, channel layout and rate conversion
//!
//! A resampling context stays unbound until the first real frame arrives
//! and binds to that frame's format. A later frame in a different input
//! format, or a request for a different output format, rebuilds it.

use crate::error::MediaResult;
use crate::frame::{AudioFormat, AudioFrame};
use parking_lot::Mutex;
use std::f32::consts::FRAC_1_SQRT_2;
use tracing::{debug, warn};

/// Mix interleaved `input` from `from` channels to `to` channels.
///
/// Mono to many scales each copy by 1/sqrt(2); many to mono sums and scales
/// by 1/sqrt(n). Other layouts copy matching channels and zero the rest.
pub fn remix_channels(input: &[f32], from: u16, to: u16) -> Vec<f32> {
    let (from, to) = (from as usize, to as usize);
    if from == to || from == 0 || to == 0 {
        return input.to_vec();
    }
    let frames = input.len() / from;
    let mut out = Vec::with_capacity(frames * to);
    for frame in input.chunks_exact(from) {
        if from == 1 {
            out.extend(std::iter::repeat(frame[0] * FRAC_1_SQRT_2).take(to));
        } else if to == 1 {
            let gain = 1.0 / (from as f32).sqrt();
            out.push(frame.iter().sum::<f32>() * gain);
        } else {
            out.extend((0..to).map(|c| frame.get(c).copied().unwrap_or(0.0)));
        }
    }
    out
}

#[derive(Debug)]
pub(crate) struct ResampleContext {
    input: AudioFormat,
    output: AudioFormat,
    /// Input frames advanced per output frame
    step: f64,
    /// Remixed input frames not yet consumed, interleaved at output channel count
    pending: Vec<f32>,
    /// Fractional read position into `pending`, in frames
    position: f64,
    next_pts: Option<i64>,
}

impl ResampleContext {
    fn new(input: AudioFormat, output: AudioFormat) -> Self {
        Self {
            input,
            output,
            step: input.sample_rate as f64 / output.sample_rate as f64,
            pending: Vec::new(),
            position: 0.0,
            next_pts: None,
        }
    }

    fn passthrough_rate(&self) -> bool {
        self.input.sample_rate == self.output.sample_rate
    }

    fn rescale_pts(&self, pts: i64) -> i64 {
        if self.passthrough_rate() {
            pts
        } else {
            (pts as i128 * self.output.sample_rate as i128 / self.input.sample_rate as i128) as i64
        }
    }

    fn pending_frames(&self) -> usize {
        self.pending.len() / self.output.channels as usize
    }

    /// Emit interpolated frames while both taps are available, or, when
    /// flushing, until the held input is exhausted (last sample repeated).
    fn interpolate(&mut self, flush: bool) -> Vec<f32> {
        let channels = self.output.channels as usize;
        let available = self.pending_frames();
        let mut out = Vec::new();
        if available == 0 {
            return out;
        }
        let limit = if flush {
            available as f64
        } else {
            available as f64 - 1.0
        };
        while self.position < limit {
            let lo = self.position.floor() as usize;
            let hi = (lo + 1).min(available - 1);
            let frac = (self.position - lo as f64) as f32;
            for c in 0..channels {
                let a = self.pending[lo * channels + c];
                let b = self.pending[hi * channels + c];
                out.push(a + (b - a) * frac);
            }
            self.position += self.step;
        }

        if flush {
            self.pending.clear();
            self.position = 0.0;
        } else {
            let consumed = (self.position.floor() as usize).min(available - 1);
            self.pending.drain(..consumed * channels);
            self.position -= consumed as f64;
        }
        out
    }

    fn emit(&mut self, samples: Vec<f32>, input_pts: Option<i64>) -> MediaResult<Option<AudioFrame>> {
        if samples.is_empty() {
            return Ok(None);
        }
        let nb_samples = samples.len() / self.output.channels as usize;
        let pts = if self.passthrough_rate() {
            input_pts.or(self.next_pts).unwrap_or(0)
        } else {
            self.next_pts.or(input_pts).unwrap_or(0)
        };
        self.next_pts = Some(pts + nb_samples as i64);
        AudioFrame::from_interleaved_as(self.output, &samples, pts).map(Some)
    }

    fn process(&mut self, frame: Option<&AudioFrame>) -> MediaResult<Option<AudioFrame>> {
        let frame = match frame {
            Some(frame) => frame,
            None => {
                let tail = if self.passthrough_rate() {
                    Vec::new()
                } else {
                    self.interpolate(true)
                };
                let out = self.emit(tail, None);
                self.next_pts = None;
                return out;
            }
        };

        let mixed = remix_channels(
            &frame.to_f32_interleaved(),
            self.input.channels,
            self.output.channels,
        );
        let input_pts = Some(self.rescale_pts(frame.pts()));
        if self.passthrough_rate() {
            return self.emit(mixed, input_pts);
        }

        if self.next_pts.is_none() {
            self.next_pts = input_pts;
        }
        self.pending.extend_from_slice(&mixed);
        let out = self.interpolate(false);
        self.emit(out, None)
    }
}

#[derive(Debug, Default)]
pub(crate) enum ResampleState {
    #[default]
    Unbound,
    Bound(ResampleContext),
}

impl ResampleState {
    /// Convert one frame, or flush held samples when `frame` is `None`
    pub(crate) fn resample(
        &mut self,
        frame: Option<&AudioFrame>,
        output: AudioFormat,
    ) -> MediaResult<Option<AudioFrame>> {
        output.validate()?;
        if let Some(frame) = frame {
            let rebuild = match self {
                ResampleState::Bound(ctx) => ctx.input != frame.format() || ctx.output != output,
                ResampleState::Unbound => true,
            };
            if rebuild {
                if let ResampleState::Bound(ctx) = self {
                    if !ctx.pending.is_empty() {
                        warn!(
                            "Resampler rebinding from {} discards {} held samples",
                            ctx.input,
                            ctx.pending_frames()
                        );
                    }
                }
                debug!("Resampler bound {} -> {}", frame.format(), output);
                *self = ResampleState::Bound(ResampleContext::new(frame.format(), output));
            }
        }

        match self {
            ResampleState::Bound(ctx) => ctx.process(frame),
            ResampleState::Unbound => Ok(None),
        }
    }

    pub(crate) fn is_bound(&self) -> bool {
        matches!(self, ResampleState::Bound(_))
    }
}

/// Converts audio frames between sample formats, rates and channel counts.
///
/// Calls on one instance are serialized.
#[derive(Debug, Default)]
pub struct Resampler {
    state: Mutex<ResampleState>,
}

impl Resampler {
    /// Create an unbound resampler
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert `frame` to `output`.
    ///
    /// `None` drains samples held for interpolation; before any frame has
    /// been seen it is a no-op returning `Ok(None)`. Output PTS starts at the
    /// first input PTS (in output-rate units) and advances by the samples
    /// produced.
    pub fn resample(
        &self,
        frame: Option<&AudioFrame>,
        output: AudioFormat,
    ) -> MediaResult<Option<AudioFrame>> {
        self.state.lock().resample(frame, output)
    }

    /// Whether a conversion context has been bound
    pub fn is_bound(&self) -> bool {
        self.state.lock().is_bound()
    }

    /// Drop the bound context and any held samples
    pub fn reset(&self) {
        *self.state.lock() = ResampleState::Unbound;
    }
}
