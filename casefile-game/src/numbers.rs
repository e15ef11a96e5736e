//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Ceil a f64 into a usize. NaN and non-positive values give 0, values past
/// the usize range (including +inf) saturate at `usize::MAX`.
#[must_use]
pub fn ceil_f64_to_usize(value: f64) -> usize {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    let max = cast::<usize, f64>(usize::MAX).unwrap_or(f64::MAX);
    cast::<f64, usize>(value.min(max).ceil()).unwrap_or(usize::MAX)
}

/// Convert usize to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert i32 ratio parts to a percentage clamped to `[0, max]`.
///
/// A non-positive denominator yields 0.
#[must_use]
pub fn ratio_to_percent(numerator: i32, denominator: i32, max: u8) -> u8 {
    if denominator <= 0 {
        return 0;
    }
    let ratio = (f64::from(numerator) / f64::from(denominator)).clamp(0.0, 1.0);
    let percent = round_f64_to_i32(ratio * f64::from(max));
    u8::try_from(percent.clamp(0, i32::from(max))).unwrap_or(max)
}
