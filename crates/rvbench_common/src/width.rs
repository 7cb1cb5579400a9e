//! Bit-width helpers for address and data bounds checks.

/// Returns a mask with the low `width` bits set.
///
/// Widths of 64 or more yield `u64::MAX`.
pub fn width_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Returns `true` if `value < 2^width`.
pub fn fits_width(value: u64, width: u32) -> bool {
    value & !width_mask(width) == 0
}
