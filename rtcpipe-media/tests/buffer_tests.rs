//! Integration tests for track buffers
//!
//! Video reordering and eviction, audio FIFO accounting and the format
//! conversion applied on pop.

use rtcpipe_core::MediaKind;
use rtcpipe_media::*;
use std::f32::consts::FRAC_1_SQRT_2;
use std::sync::Arc;

fn video(pts: i64) -> Option<Arc<VideoFrame>> {
    Some(Arc::new(VideoFrame::black(PixelFormat::Yuv420p, 8, 8, pts)))
}

fn stereo(nb_samples: usize, value: f32, pts: i64) -> AudioFrame {
    AudioFrame::from_f32_interleaved(vec![value; nb_samples * 2], 48000, 2, pts).unwrap()
}

// ============================================================================
// VIDEO
// ============================================================================

#[test]
fn test_video_reorders_by_pts() {
    let buffer = VideoTrackBuffer::new();
    buffer.push(video(2));
    buffer.push(video(1));

    assert_eq!(buffer.pop().unwrap().pts(), 1);
    assert_eq!(buffer.pop().unwrap().pts(), 2);
    assert!(buffer.pop().is_none());
}

#[test]
fn test_video_pop_empty() {
    let buffer = VideoTrackBuffer::new();
    assert!(buffer.pop().is_none());
    assert!(buffer.pop_as(PixelFormat::Rgb24).unwrap().is_none());
}

#[test]
fn test_video_eviction_keeps_highest_pts() {
    let buffer = VideoTrackBuffer::new();
    for pts in 0..12 {
        buffer.push(video(pts));
    }
    assert_eq!(buffer.len(), 10);

    let popped: Vec<i64> = std::iter::from_fn(|| buffer.pop()).map(|f| f.pts()).collect();
    assert_eq!(popped, (2..12).collect::<Vec<_>>());
}

#[test]
fn test_video_eviction_by_pts_not_arrival() {
    let buffer = VideoTrackBuffer::with_config(VideoBufferConfig {
        capacity: 2,
        ..VideoBufferConfig::default()
    });
    buffer.push(video(10));
    buffer.push(video(20));
    // Evicts 10 first, then the late frame 5 sits at the front
    buffer.push(video(5));

    assert_eq!(buffer.pop().unwrap().pts(), 5);
    assert_eq!(buffer.pop().unwrap().pts(), 20);
}

#[test]
fn test_video_null_push_ignored() {
    let buffer = VideoTrackBuffer::new();
    buffer.push(None);
    assert!(buffer.is_empty());
}

#[test]
fn test_video_pop_scaled() {
    let buffer = VideoTrackBuffer::new();
    buffer.push(Some(Arc::new(VideoFrame::black(PixelFormat::Rgb24, 64, 48, 900))));

    let frame = buffer.pop_scaled(PixelFormat::Nv12, 32, 24).unwrap().unwrap();
    assert_eq!((frame.width(), frame.height()), (32, 24));
    assert_eq!(frame.format(), PixelFormat::Nv12);
    assert_eq!(frame.pts(), 900);
}

#[test]
fn test_video_clear() {
    let buffer = VideoTrackBuffer::new();
    buffer.push(video(1));
    buffer.push(video(2));
    buffer.clear();
    assert!(buffer.pop().is_none());
}

// ============================================================================
// AUDIO
// ============================================================================

#[test]
fn test_audio_chunks_span_pushes() {
    let buffer = AudioTrackBuffer::new();
    buffer.push(Some(&stereo(800, 0.25, 1))).unwrap();
    buffer.push(Some(&stereo(960, -0.5, 801))).unwrap();

    let chunk = buffer.pop_audio(SampleFormat::F32, 48000, 2).unwrap().unwrap();
    assert_eq!(chunk.nb_samples(), 960);
    assert_eq!(chunk.pts(), 1);

    let samples = chunk.to_f32_interleaved();
    assert!(samples[..1600].iter().all(|&s| s == 0.25));
    assert!(samples[1600..].iter().all(|&s| s == -0.5));

    assert_eq!(buffer.len(), 800);
    assert!(buffer.pop_audio(SampleFormat::F32, 48000, 2).unwrap().is_none());
}

#[test]
fn test_audio_pop_empty() {
    let buffer = AudioTrackBuffer::new();
    assert!(buffer.pop_audio(SampleFormat::S16, 48000, 2).unwrap().is_none());
    assert_eq!(buffer.next_pts(), None);
}

#[test]
fn test_audio_mono_round_trip() {
    let buffer = AudioTrackBuffer::new();
    let input: Vec<f32> = (0..960).map(|i| ((i % 100) as f32 - 50.0) / 100.0).collect();
    let frame = AudioFrame::from_f32_interleaved(input.clone(), 48000, 1, 0).unwrap();
    buffer.push(Some(&frame)).unwrap();

    let mono = buffer.pop_audio(SampleFormat::F32, 48000, 1).unwrap().unwrap();
    assert_eq!(mono.channels(), 1);
    for (out, expected) in mono.to_f32_interleaved().iter().zip(&input) {
        assert!((out - expected).abs() < 1e-4);
    }
}

#[test]
fn test_audio_mono_upmix_is_equal_power() {
    let buffer = AudioTrackBuffer::new();
    let frame = AudioFrame::from_f32_interleaved(vec![0.8; 960], 48000, 1, 0).unwrap();
    buffer.push(Some(&frame)).unwrap();

    let out = buffer.pop_audio(SampleFormat::F32, 48000, 2).unwrap().unwrap();
    for sample in out.to_f32_interleaved() {
        assert!((sample - 0.8 * FRAC_1_SQRT_2).abs() < 1e-3);
    }
}

#[test]
fn test_audio_s16_output() {
    let buffer = AudioTrackBuffer::new();
    buffer.push(Some(&stereo(960, 0.5, 0))).unwrap();

    let out = buffer.pop_audio(SampleFormat::S16, 48000, 2).unwrap().unwrap();
    assert_eq!(out.sample_format(), SampleFormat::S16);
    assert!(out.s16_plane(0).unwrap().iter().all(|&s| (s - 16384).abs() <= 1));
}

#[test]
fn test_audio_overflow_bound() {
    let buffer = AudioTrackBuffer::new();
    for i in 0..15 {
        buffer.push(Some(&stereo(960, 0.0, i * 960))).unwrap();
    }
    assert!(buffer.len() <= AudioBufferConfig::default().max_buffered_samples);
}

#[test]
fn test_audio_oversized_frame_keeps_tail() {
    let buffer = AudioTrackBuffer::with_config(AudioBufferConfig {
        max_buffered_samples: 1920,
        frame_size: 960,
    });
    let samples: Vec<f32> = (0..3000)
        .flat_map(|i| [i as f32 / 4096.0, i as f32 / 4096.0])
        .collect();
    let frame = AudioFrame::from_f32_interleaved(samples, 48000, 2, 0).unwrap();
    buffer.push(Some(&frame)).unwrap();

    assert_eq!(buffer.len(), 1920);
    assert_eq!(buffer.next_pts(), Some(1080));
    let chunk = buffer.pop_audio(SampleFormat::F32, 48000, 2).unwrap().unwrap();
    assert!((chunk.to_f32_interleaved()[0] - 1080.0 / 4096.0).abs() < 1e-6);
}

#[test]
fn test_audio_pop_rejects_invalid_target() {
    let buffer = AudioTrackBuffer::new();
    buffer.push(Some(&stereo(960, 0.2, 0))).unwrap();

    let err = buffer.pop_audio(SampleFormat::F32, 48000, 0).unwrap_err();
    assert!(matches!(err, MediaError::InvalidConfiguration { .. }));
    let err = buffer.pop_audio(SampleFormat::S16, 0, 2).unwrap_err();
    assert!(matches!(err, MediaError::InvalidConfiguration { .. }));

    // Nothing was consumed by the rejected calls
    assert_eq!(buffer.len(), 960);
    assert!(buffer.pop_audio(SampleFormat::F32, 48000, 2).unwrap().is_some());
}

#[test]
fn test_audio_resampled_input() {
    let buffer = AudioTrackBuffer::new();
    let frame = AudioFrame::from_f32_interleaved(vec![0.1; 640], 16000, 1, 0).unwrap();
    buffer.push(Some(&frame)).unwrap();
    buffer.push(None).unwrap();

    // 640 samples at 16 kHz are 1920 at 48 kHz, give or take interpolation rounding
    let len = buffer.len();
    assert!((1918..=1922).contains(&len), "got {}", len);
}

// ============================================================================
// TRACK WRAPPER
// ============================================================================

#[test]
fn test_media_track_dispatch() {
    let track = MediaTrack::new(MediaKind::Audio).unwrap();
    track.push(Some(&MediaFrame::from(stereo(960, 0.2, 5)))).unwrap();

    assert!(matches!(
        track.pop_video(PixelFormat::Rgb24),
        Err(MediaError::InvalidMediaType { .. })
    ));
    let popped = track.pop().unwrap().unwrap();
    assert_eq!(popped.kind(), MediaKind::Audio);
    assert_eq!(popped.pts(), 5);
}
