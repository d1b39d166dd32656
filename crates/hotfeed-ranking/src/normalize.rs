//! Range normalization.

/// Upper bound of a normalized value.
pub const NORMALIZED_MAX: i64 = 100;

/// Map `value` into `0..=100` relative to `[min, max]`.
///
/// Uses truncating integer division. A degenerate range (`max <= min`)
/// yields 0. Values outside the range are clamped first. Arithmetic is
/// done in `i128` so millisecond timestamps cannot overflow.
pub fn normalize(value: i128, min: i128, max: i128) -> i64 {
    if max <= min {
        return 0;
    }
    let value = value.clamp(min, max);
    let scaled = (value - min) * NORMALIZED_MAX as i128 / (max - min);
    scaled as i64
}
