//! Wall-clock-synchronised replay of stored frames.
//!
//! The scheduler captures one reference instant when playback starts and
//! waits for `start + timestamp[i]` after drawing frame `i`. Deadlines are
//! absolute, so render time never accumulates into drift. A late frame is
//! still drawn and the scheduler moves on without sleeping; frames are never
//! dropped to catch up.

use std::time::{Duration, Instant};

use crate::ascii::FrameRenderer;
use crate::cancel::CancelToken;
use crate::sampler::TARGET_FPS;
use crate::store::{FrameReader, StoreError};
use crate::terminal::{geometry_or_fallback, TerminalEnv};

/// Lifecycle of one playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    NotStarted,
    Running,
    Completed,
    Cancelled,
}

impl PlaybackState {
    /// Whether the state is final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Completed | PlaybackState::Cancelled)
    }
}

/// Where a [`Timeline`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineSource {
    /// Read from the store's timestamp log
    Logged,
    /// Fixed-rate `i / 24` timeline, used when the log is unusable
    Synthesized,
}

/// Display offsets, in seconds from playback start, one per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    offsets: Vec<f64>,
    source: TimelineSource,
}

impl Timeline {
    /// Fixed-rate timeline of `frame_count` entries at the target rate.
    pub fn synthesized(frame_count: usize) -> Self {
        Self {
            offsets: (0..frame_count)
                .map(|i| i as f64 / TARGET_FPS as f64)
                .collect(),
            source: TimelineSource::Synthesized,
        }
    }

    /// Timeline from logged timestamps, fitted to `frame_count` entries.
    ///
    /// Extra entries are ignored. Missing trailing entries continue from the
    /// last logged value at the target frame period.
    pub fn from_log(mut offsets: Vec<f64>, frame_count: usize) -> Self {
        offsets.truncate(frame_count);
        if offsets.len() < frame_count {
            log::warn!(
                "timestamp log has {} entries for {} frames; extending at {} fps",
                offsets.len(),
                frame_count,
                TARGET_FPS
            );
            let last = offsets.last().copied().unwrap_or(0.0);
            let base = offsets.len();
            let period = 1.0 / TARGET_FPS as f64;
            let extend_from = if base == 0 { 0 } else { 1 };
            offsets.extend(
                (0..frame_count - base).map(|k| last + (k + extend_from) as f64 * period),
            );
        }
        Self {
            offsets,
            source: TimelineSource::Logged,
        }
    }

    /// Load the timeline for `frame_count` frames from `reader`.
    ///
    /// A missing or unreadable log is not fatal: a warning is logged and a
    /// fixed-rate timeline is used instead.
    pub fn load<R: FrameReader + ?Sized>(reader: &R, frame_count: usize) -> Self {
        match reader.read_timestamps() {
            Ok(offsets) => Self::from_log(offsets, frame_count),
            Err(StoreError::TimestampLogMissing(path)) => {
                log::warn!(
                    "timestamp log {} not found, playing at a fixed {} fps",
                    path.display(),
                    TARGET_FPS
                );
                Self::synthesized(frame_count)
            }
            Err(e) => {
                log::warn!("{}; playing at a fixed {} fps", e, TARGET_FPS);
                Self::synthesized(frame_count)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn source(&self) -> TimelineSource {
        self.source
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// Offset of frame `index` as a duration; negative or non-finite values
    /// count as zero.
    pub fn offset(&self, index: usize) -> Duration {
        let secs = self.offsets.get(index).copied().unwrap_or(0.0);
        if secs.is_finite() && secs > 0.0 {
            Duration::from_secs_f64(secs)
        } else {
            Duration::ZERO
        }
    }
}

/// Errors that end playback early.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("playback already {0:?}")]
    AlreadyStarted(PlaybackState),

    #[error("failed to draw frame {index}: {source}")]
    Output {
        index: usize,
        source: std::io::Error,
    },
}

/// Counters for one playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    pub state: PlaybackState,
    /// Frames drawn
    pub rendered: usize,
    /// Frames that could not be read and were skipped
    pub skipped: usize,
    /// Frames drawn after their deadline had already passed
    pub late: usize,
}

/// Replays stored frames on a terminal at their recorded times.
#[derive(Debug)]
pub struct PlaybackScheduler {
    state: PlaybackState,
    cancel: CancelToken,
    renderer: FrameRenderer,
}

impl PlaybackScheduler {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            state: PlaybackState::NotStarted,
            cancel,
            renderer: FrameRenderer::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Play every frame in `timeline` order.
    ///
    /// For each index: read the frame, render it for the terminal's current
    /// geometry, draw it, then wait for its deadline. An unreadable frame is
    /// reported and skipped without waiting. Cancellation ends playback in
    /// [`PlaybackState::Cancelled`] with no further frames drawn.
    pub fn run<R, T>(
        &mut self,
        reader: &R,
        timeline: &Timeline,
        terminal: &mut T,
    ) -> Result<PlaybackReport, PlaybackError>
    where
        R: FrameReader + ?Sized,
        T: TerminalEnv + ?Sized,
    {
        if self.state != PlaybackState::NotStarted {
            return Err(PlaybackError::AlreadyStarted(self.state));
        }

        self.state = PlaybackState::Running;
        let start = Instant::now();
        let mut report = PlaybackReport {
            state: PlaybackState::Running,
            rendered: 0,
            skipped: 0,
            late: 0,
        };

        for index in 0..timeline.len() {
            if self.cancel.is_cancelled() {
                return Ok(self.finish(report, PlaybackState::Cancelled));
            }

            let frame = match reader.read_frame(index) {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("skipping frame {}: {}", index, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let geometry = geometry_or_fallback(terminal);
            let text = self.renderer.render(&frame, geometry).to_string_display();
            if let Err(source) = terminal.present(&text) {
                self.state = PlaybackState::Cancelled;
                return Err(PlaybackError::Output { index, source });
            }
            report.rendered += 1;

            let deadline = start + timeline.offset(index);
            if Instant::now() > deadline {
                report.late += 1;
                log::debug!("frame {} drawn {:?} late", index, Instant::now() - deadline);
            }
            if self.cancel.wait_until(deadline) {
                return Ok(self.finish(report, PlaybackState::Cancelled));
            }
        }

        Ok(self.finish(report, PlaybackState::Completed))
    }

    fn finish(&mut self, mut report: PlaybackReport, state: PlaybackState) -> PlaybackReport {
        self.state = state;
        report.state = state;
        if state == PlaybackState::Cancelled {
            log::info!("playback stopped after {} frames", report.rendered);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{GrayFrame, TerminalGeometry};
    use std::path::PathBuf;

    struct MemoryFrames {
        frames: Vec<Option<GrayFrame>>,
        timestamps: Option<Vec<f64>>,
    }

    impl FrameReader for MemoryFrames {
        fn read_frame(&self, index: usize) -> Result<GrayFrame, StoreError> {
            self.frames[index]
                .clone()
                .ok_or_else(|| StoreError::FrameRead {
                    index,
                    path: PathBuf::from("memory"),
                    source: image::ImageError::IoError(std::io::Error::other("missing")),
                })
        }

        fn read_timestamps(&self) -> Result<Vec<f64>, StoreError> {
            self.timestamps
                .clone()
                .ok_or_else(|| StoreError::TimestampLogMissing(PathBuf::from("timestamps.txt")))
        }
    }

    #[derive(Default)]
    struct Screen {
        frames: Vec<String>,
    }

    impl TerminalEnv for Screen {
        fn geometry(&self) -> Option<TerminalGeometry> {
            Some(TerminalGeometry::new(8, 4))
        }

        fn present(&mut self, text: &str) -> std::io::Result<()> {
            self.frames.push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_synthesized_timeline() {
        let timeline = Timeline::synthesized(3);
        assert_eq!(timeline.offsets(), &[0.0, 1.0 / 24.0, 2.0 / 24.0]);
        assert_eq!(timeline.source(), TimelineSource::Synthesized);
    }

    #[test]
    fn test_from_log_truncates() {
        let timeline = Timeline::from_log(vec![0.0, 0.1, 0.2, 0.3], 2);
        assert_eq!(timeline.offsets(), &[0.0, 0.1]);
    }

    #[test]
    fn test_from_log_extends_short_log() {
        let timeline = Timeline::from_log(vec![0.0, 0.5], 4);
        let offsets = timeline.offsets();
        assert_eq!(offsets.len(), 4);
        assert!((offsets[2] - (0.5 + 1.0 / 24.0)).abs() < 1e-12);
        assert!((offsets[3] - (0.5 + 2.0 / 24.0)).abs() < 1e-12);
    }

    #[test]
    fn test_from_empty_log_extends_from_zero() {
        let timeline = Timeline::from_log(Vec::new(), 2);
        assert_eq!(timeline.offsets(), &[0.0, 1.0 / 24.0]);
    }

    #[test]
    fn test_load_falls_back_when_log_missing() {
        let reader = MemoryFrames {
            frames: Vec::new(),
            timestamps: None,
        };
        let timeline = Timeline::load(&reader, 5);
        assert_eq!(timeline.source(), TimelineSource::Synthesized);
        assert_eq!(timeline.len(), 5);
    }

    #[test]
    fn test_offset_clamps_negative() {
        let timeline = Timeline::from_log(vec![-1.0, f64::NAN], 2);
        assert_eq!(timeline.offset(0), Duration::ZERO);
        assert_eq!(timeline.offset(1), Duration::ZERO);
    }

    #[test]
    fn test_run_completes_and_skips_unreadable() {
        let reader = MemoryFrames {
            frames: vec![
                Some(GrayFrame::filled(4, 4, 0)),
                None,
                Some(GrayFrame::filled(4, 4, 255)),
            ],
            timestamps: Some(vec![0.0, 0.001, 0.002]),
        };
        let timeline = Timeline::load(&reader, 3);
        let mut screen = Screen::default();
        let mut scheduler = PlaybackScheduler::new(CancelToken::new());

        let report = scheduler.run(&reader, &timeline, &mut screen).unwrap();

        assert_eq!(report.state, PlaybackState::Completed);
        assert_eq!(scheduler.state(), PlaybackState::Completed);
        assert_eq!(report.rendered, 2);
        assert_eq!(report.skipped, 1);
        assert!(screen.frames[0].chars().all(|c| c == '@' || c == '\n'));
        assert!(screen.frames[1].chars().all(|c| c == '.' || c == '\n'));
    }

    #[test]
    fn test_run_twice_is_rejected() {
        let reader = MemoryFrames {
            frames: Vec::new(),
            timestamps: Some(Vec::new()),
        };
        let timeline = Timeline::load(&reader, 0);
        let mut screen = Screen::default();
        let mut scheduler = PlaybackScheduler::new(CancelToken::new());

        scheduler.run(&reader, &timeline, &mut screen).unwrap();
        let err = scheduler.run(&reader, &timeline, &mut screen).unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::AlreadyStarted(PlaybackState::Completed)
        ));
    }

    #[test]
    fn test_cancelled_before_start_draws_nothing() {
        let reader = MemoryFrames {
            frames: vec![Some(GrayFrame::filled(2, 2, 0)); 3],
            timestamps: Some(vec![0.0, 0.1, 0.2]),
        };
        let token = CancelToken::new();
        token.cancel();
        let timeline = Timeline::load(&reader, 3);
        let mut screen = Screen::default();

        let report = PlaybackScheduler::new(token)
            .run(&reader, &timeline, &mut screen)
            .unwrap();
        assert_eq!(report.state, PlaybackState::Cancelled);
        assert_eq!(report.rendered, 0);
        assert!(screen.frames.is_empty());
    }

    #[test]
    fn test_state_terminal() {
        assert!(!PlaybackState::NotStarted.is_terminal());
        assert!(!PlaybackState::Running.is_terminal());
        assert!(PlaybackState::Completed.is_terminal());
        assert!(PlaybackState::Cancelled.is_terminal());
    }
}
