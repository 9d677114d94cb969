//! Resampling a grayscale frame onto a character grid.

use crate::frame::GrayFrame;

/// Resample a frame to `cols`x`rows` intensity cells.
///
/// Each cell is the average of the source pixels it covers. When the grid is
/// larger than the source along an axis, each cell still covers at least one
/// pixel, which degrades to nearest-pixel sampling.
///
/// # Returns
/// `cols * rows` intensity values in row-major order, or an empty vector for a
/// degenerate frame or grid.
pub fn downsample(frame: &GrayFrame, cols: u16, rows: u16) -> Vec<u8> {
    let mut buffer = Vec::new();
    downsample_into(frame, cols, rows, &mut buffer);
    buffer
}

/// Allocation-reusing version of [`downsample`].
///
/// # Returns
/// The number of values written to `buffer`.
pub fn downsample_into(frame: &GrayFrame, cols: u16, rows: u16, buffer: &mut Vec<u8>) -> usize {
    buffer.clear();

    if cols == 0 || rows == 0 || frame.is_empty() || frame.data.is_empty() {
        return 0;
    }

    let output_size = (cols as usize) * (rows as usize);
    buffer.reserve(output_size);

    let img_width = frame.width;
    let img_height = frame.height;
    let cell_w = img_width as f64 / cols as f64;
    let cell_h = img_height as f64 / rows as f64;

    for cy in 0..rows as u32 {
        let (start_y, end_y) = cell_span(cy, cell_h, img_height);
        for cx in 0..cols as u32 {
            let (start_x, end_x) = cell_span(cx, cell_w, img_width);

            let mut sum = 0u64;
            let mut count = 0u64;

            for py in start_y..end_y {
                let row = (py as usize) * (img_width as usize);
                for px in start_x..end_x {
                    if let Some(&v) = frame.data.get(row + px as usize) {
                        sum += v as u64;
                        count += 1;
                    }
                }
            }

            buffer.push(if count > 0 { (sum / count) as u8 } else { 0 });
        }
    }

    output_size
}

/// Pixel range `[start, end)` covered by cell `index`, never empty.
fn cell_span(index: u32, cell_size: f64, limit: u32) -> (u32, u32) {
    let start = ((index as f64 * cell_size) as u32).min(limit - 1);
    let end = (((index + 1) as f64 * cell_size) as u32).clamp(start + 1, limit);
    (start, end)
}
