//! Frame and geometry value types shared by sampling, storage and playback.

use std::fmt;

/// A single-channel raster frame (one byte of intensity per pixel, row-major).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayFrame {
    /// Intensity samples (0-255), `width * height` bytes
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl GrayFrame {
    /// Create a frame from raw intensity data.
    ///
    /// Returns `None` when `data` does not hold exactly `width * height` samples.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    /// Create a frame filled with a single intensity.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            data: vec![value; (width as usize) * (height as usize)],
            width,
            height,
        }
    }

    /// Whether the frame has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width-over-height ratio of the frame.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// A decoded frame together with its capture timestamp.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub frame: GrayFrame,
    /// Presentation time in seconds from the start of the stream
    pub timestamp: f64,
}

/// Character-cell size of the output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalGeometry {
    pub columns: u16,
    pub rows: u16,
}

impl TerminalGeometry {
    /// Geometry used when the terminal size cannot be determined.
    pub const FALLBACK: TerminalGeometry = TerminalGeometry {
        columns: 150,
        rows: 40,
    };

    pub fn new(columns: u16, rows: u16) -> Self {
        Self { columns, rows }
    }

    /// Column-over-row ratio, using raw cell counts.
    pub fn aspect_ratio(&self) -> f64 {
        self.columns as f64 / self.rows as f64
    }

    /// Whether either dimension is zero.
    pub fn is_degenerate(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }
}

impl Default for TerminalGeometry {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for TerminalGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}
