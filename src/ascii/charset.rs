//! Glyph ramp used to turn intensity into characters.

/// Glyph density ramp (11 levels).
/// `@` stands for the darkest intensity and `.` for the lightest; the
/// visual weight of the glyph carries the brightness, not its name.
pub const GLYPH_RAMP: [char; 11] = ['@', '#', 'S', '%', '?', '*', '+', ';', ':', ',', '.'];

/// Index into [`GLYPH_RAMP`] for an intensity.
///
/// Normalises to `[0, 1]`, scales by the ramp length minus one and truncates.
/// Integer arithmetic keeps both ends exact: 0 maps to 0 and 255 maps to 10.
#[inline]
pub fn glyph_index(intensity: u8) -> usize {
    (intensity as usize * (GLYPH_RAMP.len() - 1)) / 255
}

/// Glyph for an intensity.
#[inline]
pub fn glyph(intensity: u8) -> char {
    GLYPH_RAMP[glyph_index(intensity)]
}
