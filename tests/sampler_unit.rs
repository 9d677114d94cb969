//! Tests for timestamp-driven frame sampling.
//!
//! Synthetic sources at several rates are sampled down to 24 fps and the
//! emitted timeline is checked for count, ordering and spacing.

use ascii_reel::frame::{GrayFrame, SourceFrame};
use ascii_reel::sampler::{FrameSampler, FrameSink, SampleError, TARGET_FPS};
use ascii_reel::source::{FrameSource, SourceError, VideoInfo};
use ascii_reel::store::StoreError;

/// Source that yields frames at the given timestamps.
struct TimedSource {
    timestamps: Vec<f64>,
    fps: f64,
    next: usize,
    fail_at: Option<usize>,
}

impl TimedSource {
    fn constant(fps: f64, seconds: f64) -> Self {
        let count = (fps * seconds).round() as usize;
        Self::at((0..count).map(|i| i as f64 / fps).collect(), fps)
    }

    fn at(timestamps: Vec<f64>, fps: f64) -> Self {
        Self {
            timestamps,
            fps,
            next: 0,
            fail_at: None,
        }
    }
}

impl FrameSource for TimedSource {
    fn info(&self) -> VideoInfo {
        VideoInfo {
            width: 4,
            height: 3,
            fps: self.fps,
        }
    }

    fn next_frame(&mut self) -> Result<Option<SourceFrame>, SourceError> {
        if self.fail_at == Some(self.next) {
            return Err(SourceError::Io(std::io::Error::other("decoder died")));
        }
        let Some(&timestamp) = self.timestamps.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        Ok(Some(SourceFrame {
            frame: GrayFrame::filled(4, 3, (self.next % 256) as u8),
            timestamp,
        }))
    }
}

#[derive(Default)]
struct Timeline {
    timestamps: Vec<f64>,
}

impl FrameSink for Timeline {
    fn append(&mut self, _frame: &GrayFrame, timestamp: f64) -> Result<usize, StoreError> {
        self.timestamps.push(timestamp);
        Ok(self.timestamps.len() - 1)
    }
}

fn sample(source: &mut TimedSource) -> Vec<f64> {
    let mut sink = Timeline::default();
    FrameSampler::default().run(source, &mut sink).unwrap();
    sink.timestamps
}

#[test]
fn test_target_is_24() {
    assert_eq!(TARGET_FPS, 24);
    assert_eq!(FrameSampler::default().target_fps(), 24);
}

#[test]
fn test_two_seconds_at_30fps_gives_48() {
    let sampled = sample(&mut TimedSource::constant(30.0, 2.0));
    assert_eq!(sampled.len(), 48);
    assert_eq!(sampled[0], 0.0);
}

#[test]
fn test_count_tracks_duration_for_common_rates() {
    for fps in [24.0, 25.0, 29.97, 30.0, 48.0, 50.0, 59.94, 60.0, 120.0] {
        for seconds in [1.0, 2.5, 10.0] {
            let sampled = sample(&mut TimedSource::constant(fps, seconds));
            let expected = seconds * TARGET_FPS as f64;
            assert!(
                (sampled.len() as f64 - expected).abs() <= 1.0,
                "{} fps for {}s: {} frames, expected ~{}",
                fps,
                seconds,
                sampled.len(),
                expected
            );
        }
    }
}

#[test]
fn test_spacing_for_constant_rate_sources() {
    let max_gap = 2.0 / TARGET_FPS as f64 + 1e-9;
    for fps in [24.0, 25.0, 30.0, 50.0, 60.0, 144.0] {
        let sampled = sample(&mut TimedSource::constant(fps, 4.0));
        for pair in sampled.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= 0.0, "{} fps: negative gap {}", fps, gap);
            assert!(gap <= max_gap, "{} fps: gap {} too large", fps, gap);
        }
    }
}

#[test]
fn test_sampled_timestamps_are_non_decreasing() {
    let sampled = sample(&mut TimedSource::constant(60.0, 3.0));
    assert!(sampled.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_each_kept_frame_is_at_or_after_its_slot() {
    let sampled = sample(&mut TimedSource::constant(60.0, 3.0));
    for (k, &ts) in sampled.iter().enumerate().skip(1) {
        let slot = k as f64 / TARGET_FPS as f64;
        assert!(ts >= slot, "frame {} at {} before slot {}", k, ts, slot);
        assert!(ts < slot + 1.0 / TARGET_FPS as f64, "frame {} at {} too late", k, ts);
    }
}

#[test]
fn test_first_frame_kept_with_late_start() {
    // Stream starting at 5s: the first frame is always emitted, and every
    // later frame is already past its slot
    let mut source = TimedSource::at(vec![5.0, 5.01, 5.02], 100.0);
    let sampled = sample(&mut source);
    assert_eq!(sampled, vec![5.0, 5.01, 5.02]);
}

#[test]
fn test_variable_rate_source_follows_time_not_count() {
    // 120 fps for one second, then 10 fps for one second
    let mut timestamps: Vec<f64> = (0..120).map(|i| i as f64 / 120.0).collect();
    timestamps.extend((0..10).map(|i| 1.0 + i as f64 / 10.0));
    let sampled = sample(&mut TimedSource::at(timestamps, 30.0));

    let first_second = sampled.iter().filter(|&&t| t < 1.0).count();
    assert_eq!(first_second, 24);
    // Slow half cannot supply more than its 10 frames
    assert_eq!(sampled.len() - first_second, 10);
}

#[test]
fn test_undershooting_source_keeps_all_frames() {
    // Declares 30 fps but delivers 15
    let timestamps = (0..30).map(|i| i as f64 / 15.0).collect();
    let sampled = sample(&mut TimedSource::at(timestamps, 30.0));
    assert_eq!(sampled.len(), 30);
}

#[test]
fn test_duplicate_timestamps_are_collapsed() {
    let mut source = TimedSource::at(vec![0.0, 0.0, 0.0, 0.05, 0.05], 24.0);
    let sampled = sample(&mut source);
    assert_eq!(sampled, vec![0.0, 0.05]);
}

#[test]
fn test_source_error_is_propagated() {
    let mut source = TimedSource::constant(30.0, 1.0);
    source.fail_at = Some(10);
    let mut sink = Timeline::default();

    let err = FrameSampler::default().run(&mut source, &mut sink).unwrap_err();
    assert!(matches!(err, SampleError::Source(_)));
}

#[test]
fn test_summary_reports_source_rate() {
    let mut source = TimedSource::constant(25.0, 1.0);
    let mut sink = Timeline::default();
    let summary = FrameSampler::default().run(&mut source, &mut sink).unwrap();
    assert_eq!(summary.source_fps, 25.0);
    assert_eq!(summary.decoded, 25);
    assert_eq!(summary.sampled, sink.timestamps.len());
}
