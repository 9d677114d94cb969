//! Video frame sources.
//!
//! Sampling consumes frames through the [`FrameSource`] trait. The concrete
//! decoder shells out to ffprobe/ffmpeg ([`FfmpegSource`]).

mod ffmpeg;

pub use ffmpeg::{parse_frame_rate, parse_showinfo_pts, FfmpegSource};

use crate::frame::SourceFrame;
use std::path::PathBuf;

/// Properties of the video stream reported when a source is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Declared (nominal) frame rate of the stream
    pub fps: f64,
}

/// A producer of decoded frames in presentation order.
///
/// Timestamps are non-decreasing across one stream.
pub trait FrameSource {
    /// Stream properties.
    fn info(&self) -> VideoInfo;

    /// Next decoded frame, or `None` at the end of the stream.
    fn next_frame(&mut self) -> Result<Option<SourceFrame>, SourceError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn info(&self) -> VideoInfo {
        (**self).info()
    }

    fn next_frame(&mut self) -> Result<Option<SourceFrame>, SourceError> {
        (**self).next_frame()
    }
}

/// Errors that can occur while opening or reading a video source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot open video '{}': {reason}", path.display())]
    Unavailable { path: PathBuf, reason: String },

    #[error("{0} not found. Please install ffmpeg (it provides both ffmpeg and ffprobe)")]
    DecoderNotFound(String),

    #[error("decoder I/O error: {0}")]
    Io(#[from] std::io::Error),
}
