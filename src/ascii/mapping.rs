//! Intensity to glyph mapping over a whole grid.

use super::charset::glyph;

/// Map intensity values to glyphs from the ramp.
///
/// # Example
/// ```
/// use ascii_reel::ascii::map_to_chars;
///
/// assert_eq!(map_to_chars(&[0, 128, 255]), vec!['@', '*', '.']);
/// ```
pub fn map_to_chars(brightness: &[u8]) -> Vec<char> {
    brightness.iter().map(|&b| glyph(b)).collect()
}

/// Allocation-reusing version of [`map_to_chars`].
pub fn map_to_chars_into(brightness: &[u8], buffer: &mut Vec<char>) -> usize {
    buffer.clear();
    buffer.reserve(brightness.len());
    buffer.extend(brightness.iter().map(|&b| glyph(b)));
    brightness.len()
}
