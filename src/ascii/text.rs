//! Glyph grids and their text form.

use super::dimensions::output_dimensions;
use super::downsample::downsample_into;
use super::mapping::map_to_chars_into;
use crate::frame::{GrayFrame, TerminalGeometry};

/// A frame rendered to glyphs, ready for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsciiFrame {
    /// Glyphs in row-major order
    pub chars: Vec<char>,
    /// Width in characters
    pub width: u16,
    /// Height in characters
    pub height: u16,
}

impl AsciiFrame {
    pub fn from_chars(chars: Vec<char>, width: u16, height: u16) -> Self {
        Self {
            chars,
            width,
            height,
        }
    }

    /// Rows joined by newlines, without a trailing newline.
    pub fn to_string_display(&self) -> String {
        if self.width == 0 || self.height == 0 {
            return String::new();
        }

        self.chars
            .chunks(self.width as usize)
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Reusable buffers for rendering a stream of frames.
#[derive(Debug, Default)]
pub struct FrameRenderer {
    brightness: Vec<u8>,
    chars: Vec<char>,
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rasterize `frame` for `geometry` and map it to glyphs.
    pub fn render(&mut self, frame: &GrayFrame, geometry: TerminalGeometry) -> AsciiFrame {
        let (width, height) = output_dimensions(frame.width, frame.height, geometry);
        downsample_into(frame, width, height, &mut self.brightness);
        map_to_chars_into(&self.brightness, &mut self.chars);
        AsciiFrame::from_chars(self.chars.clone(), width, height)
    }
}

/// One-shot rendering of a frame to its text block.
pub fn render_frame(frame: &GrayFrame, geometry: TerminalGeometry) -> String {
    FrameRenderer::new().render(frame, geometry).to_string_display()
}
