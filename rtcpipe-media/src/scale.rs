//! Pixel format conversion and resizing
//!
//! Conversion goes through packed RGB using BT.601 studio-range
//! coefficients. Bilinear sampling tables are computed once per geometry and
//! kept until the input or output geometry changes.

use crate::error::{MediaError, MediaResult};
use crate::frame::{PixelFormat, VideoFrame};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
}

/// One output coordinate: the two source taps and the weight of the second
#[derive(Debug, Clone, Copy)]
struct Tap {
    lo: usize,
    hi: usize,
    frac: f32,
}

fn taps(src: u32, dst: u32) -> Vec<Tap> {
    let scale = src as f32 / dst as f32;
    let last = src.saturating_sub(1) as usize;
    (0..dst)
        .map(|d| {
            let pos = ((d as f32 + 0.5) * scale - 0.5).max(0.0);
            let lo = (pos.floor() as usize).min(last);
            Tap {
                lo,
                hi: (lo + 1).min(last),
                frac: pos - lo as f32,
            }
        })
        .collect()
}

#[derive(Debug)]
struct ScaleContext {
    geometry: Geometry,
    x_taps: Vec<Tap>,
    y_taps: Vec<Tap>,
}

impl ScaleContext {
    fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            x_taps: taps(geometry.src_width, geometry.dst_width),
            y_taps: taps(geometry.src_height, geometry.dst_height),
        }
    }

    fn resize_rgb(&self, rgb: &[u8]) -> Vec<u8> {
        let src_stride = self.geometry.src_width as usize * 3;
        let mut out = Vec::with_capacity(self.x_taps.len() * self.y_taps.len() * 3);
        for ty in &self.y_taps {
            let row_lo = &rgb[ty.lo * src_stride..(ty.lo + 1) * src_stride];
            let row_hi = &rgb[ty.hi * src_stride..(ty.hi + 1) * src_stride];
            for tx in &self.x_taps {
                for c in 0..3 {
                    let a = lerp(row_lo[tx.lo * 3 + c], row_lo[tx.hi * 3 + c], tx.frac);
                    let b = lerp(row_hi[tx.lo * 3 + c], row_hi[tx.hi * 3 + c], tx.frac);
                    out.push((a + (b - a) * ty.frac).round().clamp(0.0, 255.0) as u8);
                }
            }
        }
        out
    }
}

fn lerp(a: u8, b: u8, t: f32) -> f32 {
    a as f32 + (b as f32 - a as f32) * t
}

#[derive(Debug, Default)]
enum ScalerState {
    #[default]
    Unbound,
    Bound(ScaleContext),
}

/// Converts video frames to a requested pixel format and size.
///
/// Calls on one instance are serialized.
#[derive(Debug, Default)]
pub struct Scaler {
    state: Mutex<ScalerState>,
}

impl Scaler {
    /// Create an unbound scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a sampling context has been built
    pub fn is_bound(&self) -> bool {
        matches!(*self.state.lock(), ScalerState::Bound(_))
    }

    /// Convert `frame` to `format` at `width` x `height`, keeping its PTS.
    ///
    /// A frame already in the requested format and size is returned as is.
    pub fn scale(
        &self,
        frame: &Arc<VideoFrame>,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> MediaResult<Arc<VideoFrame>> {
        if width == 0 || height == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: format!("cannot scale to {}x{}", width, height),
            });
        }
        if frame.format() == format && frame.width() == width && frame.height() == height {
            return Ok(Arc::clone(frame));
        }

        let rgb = to_rgb24(frame);
        let rgb = if frame.width() == width && frame.height() == height {
            rgb
        } else {
            let geometry = Geometry {
                src_width: frame.width(),
                src_height: frame.height(),
                dst_width: width,
                dst_height: height,
            };
            let mut state = self.state.lock();
            let rebuild = match &*state {
                ScalerState::Bound(ctx) => ctx.geometry != geometry,
                ScalerState::Unbound => true,
            };
            if rebuild {
                debug!(
                    "Scaler bound to {}x{} -> {}x{}",
                    geometry.src_width, geometry.src_height, width, height
                );
                *state = ScalerState::Bound(ScaleContext::new(geometry));
            }
            match &*state {
                ScalerState::Bound(ctx) => ctx.resize_rgb(&rgb),
                ScalerState::Unbound => rgb,
            }
        };

        let planes = from_rgb24(&rgb, format, width, height);
        Ok(Arc::new(VideoFrame::new(
            format,
            width,
            height,
            frame.pts(),
            planes,
        )?))
    }
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    [
        clamp_u8((298 * c + 409 * e + 128) >> 8),
        clamp_u8((298 * c - 100 * d - 208 * e + 128) >> 8),
        clamp_u8((298 * c + 516 * d + 128) >> 8),
    ]
}

fn rgb_to_y(r: i32, g: i32, b: i32) -> u8 {
    clamp_u8(((66 * r + 129 * g + 25 * b + 128) >> 8) + 16)
}

fn rgb_to_uv(r: i32, g: i32, b: i32) -> (u8, u8) {
    (
        clamp_u8(((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128),
        clamp_u8(((112 * r - 94 * g - 18 * b + 128) >> 8) + 128),
    )
}

fn to_rgb24(frame: &VideoFrame) -> Vec<u8> {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let planes = frame.planes();
    let cw = w.div_ceil(2);
    match frame.format() {
        PixelFormat::Rgb24 => planes[0].clone(),
        PixelFormat::Rgba => planes[0]
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
        PixelFormat::Yuv420p => {
            let mut out = Vec::with_capacity(w * h * 3);
            for y in 0..h {
                for x in 0..w {
                    let ci = (y / 2) * cw + x / 2;
                    out.extend(yuv_to_rgb(planes[0][y * w + x], planes[1][ci], planes[2][ci]));
                }
            }
            out
        }
        PixelFormat::Nv12 => {
            let mut out = Vec::with_capacity(w * h * 3);
            for y in 0..h {
                for x in 0..w {
                    let ci = ((y / 2) * cw + x / 2) * 2;
                    out.extend(yuv_to_rgb(
                        planes[0][y * w + x],
                        planes[1][ci],
                        planes[1][ci + 1],
                    ));
                }
            }
            out
        }
    }
}

/// Average chroma of the 2x2 block at chroma coordinate (`cx`, `cy`)
fn block_chroma(rgb: &[u8], w: usize, h: usize, cx: usize, cy: usize) -> (u8, u8) {
    let (mut r, mut g, mut b, mut n) = (0i32, 0i32, 0i32, 0i32);
    for y in (cy * 2)..(cy * 2 + 2).min(h) {
        for x in (cx * 2)..(cx * 2 + 2).min(w) {
            let i = (y * w + x) * 3;
            r += rgb[i] as i32;
            g += rgb[i + 1] as i32;
            b += rgb[i + 2] as i32;
            n += 1;
        }
    }
    rgb_to_uv(r / n, g / n, b / n)
}

fn from_rgb24(rgb: &[u8], format: PixelFormat, width: u32, height: u32) -> Vec<Vec<u8>> {
    let (w, h) = (width as usize, height as usize);
    match format {
        PixelFormat::Rgb24 => vec![rgb.to_vec()],
        PixelFormat::Rgba => vec![rgb
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect()],
        PixelFormat::Yuv420p | PixelFormat::Nv12 => {
            let luma: Vec<u8> = rgb
                .chunks_exact(3)
                .map(|px| rgb_to_y(px[0] as i32, px[1] as i32, px[2] as i32))
                .collect();
            let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
            let mut u = Vec::with_capacity(cw * ch);
            let mut v = Vec::with_capacity(cw * ch);
            for cy in 0..ch {
                for cx in 0..cw {
                    let (cu, cv) = block_chroma(rgb, w, h, cx, cy);
                    u.push(cu);
                    v.push(cv);
                }
            }
            if format == PixelFormat::Yuv420p {
                vec![luma, u, v]
            } else {
                let uv = u.into_iter().zip(v).flat_map(|(a, b)| [a, b]).collect();
                vec![luma, uv]
            }
        }
    }
}
