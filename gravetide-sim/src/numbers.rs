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

/// Convert a collection length to i32, saturating at `i32::MAX`.
#[must_use]
pub fn len_to_i32(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

/// Convert a non-negative i32 roll back into an index; negatives map to 0.
#[must_use]
pub fn i32_to_index(value: i32) -> usize {
    usize::try_from(value).unwrap_or(0)
}

/// Integer percentage of `part` relative to `whole`, 0 when `whole` is not positive.
#[must_use]
pub fn percent_of(part: i32, whole: i32) -> i32 {
    if whole <= 0 {
        return 0;
    }
    let pct = i64::from(part) * 100 / i64::from(whole);
    i32::try_from(pct).unwrap_or(i32::MAX)
}

/// Scale `value` by `percent` (integer math, truncating toward zero).
#[must_use]
pub fn scale_pct(value: i32, percent: i32) -> i32 {
    let scaled = i64::from(value) * i64::from(percent) / 100;
    i32::try_from(scaled).unwrap_or(if scaled < 0 { i32::MIN } else { i32::MAX })
}

/// Scale `value` by the ratio `num / den`, returning 0 when `den` is not positive.
#[must_use]
pub fn scale_ratio(value: i32, num: i32, den: i32) -> i32 {
    if den <= 0 {
        return 0;
    }
    let scaled = f64::from(value) * f64::from(num) / f64::from(den);
    round_f64_to_i32(scaled.floor())
}
