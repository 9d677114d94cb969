//! Frame-to-text conversion for terminal display.
//!
//! The pipeline for one frame:
//!
//! 1. **Fitting** - pick a grid size that keeps the frame's aspect ratio
//!    within the terminal, then double its width
//! 2. **Downsampling** - average source pixels into grid cells
//! 3. **Glyph mapping** - map each cell's intensity onto [`GLYPH_RAMP`]
//! 4. **Joining** - rows joined with newlines into one text block

mod charset;
mod dimensions;
mod downsample;
mod mapping;
mod text;

pub use charset::{glyph, glyph_index, GLYPH_RAMP};
pub use dimensions::{fit_dimensions, output_dimensions, HORIZONTAL_DOUBLING};
pub use downsample::{downsample, downsample_into};
pub use mapping::{map_to_chars, map_to_chars_into};
pub use text::{render_frame, AsciiFrame, FrameRenderer};
