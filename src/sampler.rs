//! Timestamp-driven reduction of a video stream to a fixed target rate.
//!
//! Frames are kept by comparing their presentation time against the ideal
//! time of the next output frame rather than by keeping every n-th frame, so
//! variable-rate sources and sources whose real rate undershoots the
//! declared one stay within one target period of their ideal timeline.

use crate::cancel::CancelToken;
use crate::frame::GrayFrame;
use crate::source::{FrameSource, SourceError};
use crate::store::{FrameStore, StoreError};

/// Output rate of the sampler, in frames per second.
pub const TARGET_FPS: u32 = 24;

/// Destination of sampled frames, written as they are produced.
pub trait FrameSink {
    /// Persist one sampled frame; returns the index it was stored under.
    fn append(&mut self, frame: &GrayFrame, timestamp: f64) -> Result<usize, StoreError>;

    /// Called once after the last frame.
    fn finish(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl FrameSink for FrameStore {
    fn append(&mut self, frame: &GrayFrame, timestamp: f64) -> Result<usize, StoreError> {
        FrameStore::append(self, frame, timestamp)
    }

    fn finish(&mut self) -> Result<(), StoreError> {
        FrameStore::finish(self)
    }
}

/// Errors that can occur while sampling.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of one sampling pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSummary {
    /// Frames written to the sink
    pub sampled: usize,
    /// Frames decoded from the source
    pub decoded: usize,
    /// Declared frame rate of the source
    pub source_fps: f64,
    /// Sampling was stopped by cancellation before the stream ended
    pub cancelled: bool,
}

/// Selects frames from a source at a fixed target rate.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    target_fps: u32,
    cancel: Option<CancelToken>,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(TARGET_FPS)
    }
}

impl FrameSampler {
    pub fn new(target_fps: u32) -> Self {
        Self {
            target_fps: target_fps.max(1),
            cancel: None,
        }
    }

    /// Stop pulling frames once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Ideal time of the `emitted`-th output frame.
    pub fn slot_time(&self, emitted: usize) -> f64 {
        emitted as f64 / self.target_fps as f64
    }

    /// Whether a frame at `timestamp` is kept after `emitted` frames were kept.
    ///
    /// The first frame is always kept.
    pub fn accepts(&self, emitted: usize, timestamp: f64) -> bool {
        emitted == 0 || timestamp >= self.slot_time(emitted)
    }

    /// Drain `source`, streaming every kept frame into `sink`.
    ///
    /// On cancellation the frames kept so far stay in `sink` and the summary
    /// is marked `cancelled`. A source error raised after cancellation (a
    /// decoder interrupted along with the process) counts as cancellation.
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<SampleSummary, SampleError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let source_fps = source.info().fps;
        let mut sampled = 0usize;
        let mut decoded = 0usize;

        while !self.is_cancelled() {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) if self.is_cancelled() => {
                    log::debug!("source stopped after cancellation: {}", e);
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            if self.accepts(sampled, frame.timestamp) {
                sink.append(&frame.frame, frame.timestamp)?;
                sampled += 1;
            }
            decoded += 1;
        }
        sink.finish()?;

        let cancelled = self.is_cancelled();
        if cancelled {
            log::info!("sampling cancelled after {} of {} frames", sampled, decoded);
        } else {
            log::info!(
                "sampled {} of {} frames at {} fps (source {:.2} fps)",
                sampled,
                decoded,
                self.target_fps,
                source_fps
            );
        }

        Ok(SampleSummary {
            sampled,
            decoded,
            source_fps,
            cancelled,
        })
    }
}
