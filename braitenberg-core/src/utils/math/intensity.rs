//! Light sensor sample decoding.
//!
//! The simulator reports the first pixel of a single-channel vision sensor as a
//! signed byte, so intensities above 127 arrive wrapped negative. Decoding folds
//! them back into the unsigned range.

/// Largest decoded intensity.
pub const MAX_INTENSITY: u8 = 255;

/// Decode a raw sensor byte into an intensity in `[0, 255]`.
///
/// Negative values have 255 added. Anything still outside the range after
/// correction is clamped, so every input yields a valid reading.
pub fn decode(raw: i16) -> u8 {
    let corrected = if raw < 0 { raw + MAX_INTENSITY as i16 } else { raw };
    corrected.clamp(0, MAX_INTENSITY as i16) as u8
}

/// Encode an intensity the way the simulator transmits it (as a signed byte).
pub fn encode(intensity: u8) -> i16 {
    intensity as i8 as i16
}
