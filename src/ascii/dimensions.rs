//! Output grid size for a frame on a given terminal.

use crate::frame::TerminalGeometry;

/// Horizontal multiplier applied after fitting.
/// Glyph cells are taller than wide, so each fitted column becomes two.
pub const HORIZONTAL_DOUBLING: u16 = 2;

/// Fit a `frame_width`x`frame_height` frame into the terminal, long edge first.
///
/// Compares the frame's aspect ratio against the raw column/row ratio of the
/// terminal. A relatively wider frame is fitted to the column count and its
/// height derived from the ratio; otherwise it is fitted to the row count and
/// its width derived. No font-metric correction is applied here.
///
/// # Returns
/// `(width, height)` before horizontal doubling, each at least 1. A degenerate
/// frame or terminal yields `(0, 0)`.
pub fn fit_dimensions(frame_width: u32, frame_height: u32, geometry: TerminalGeometry) -> (u16, u16) {
    if frame_width == 0 || frame_height == 0 || geometry.is_degenerate() {
        return (0, 0);
    }

    let frame_ratio = frame_width as f64 / frame_height as f64;

    if frame_ratio > geometry.aspect_ratio() {
        let width = geometry.columns;
        let height = (width as f64 / frame_ratio).round();
        (width, clamp_cells(height))
    } else {
        let height = geometry.rows;
        let width = (height as f64 * frame_ratio).round();
        (clamp_cells(width), height)
    }
}

/// Final grid size: the fitted size with the width doubled.
///
/// # Example
/// ```
/// use ascii_reel::ascii::output_dimensions;
/// use ascii_reel::frame::TerminalGeometry;
///
/// // 1920x1080 on a 150x40 terminal fits to height: 71x40, doubled to 142x40
/// let (w, h) = output_dimensions(1920, 1080, TerminalGeometry::new(150, 40));
/// assert_eq!((w, h), (142, 40));
/// ```
pub fn output_dimensions(frame_width: u32, frame_height: u32, geometry: TerminalGeometry) -> (u16, u16) {
    let (width, height) = fit_dimensions(frame_width, frame_height, geometry);
    (width.saturating_mul(HORIZONTAL_DOUBLING), height)
}

fn clamp_cells(value: f64) -> u16 {
    value.clamp(1.0, u16::MAX as f64) as u16
}
