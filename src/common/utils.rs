//! Utility functions for percent arithmetic and tick alignment.

use chrono::{DateTime, Duration, Local, Timelike};

/// Clamp a percent value to the device scale [0, 100].
pub fn clamp_percent(value: i64) -> i64 {
    value.clamp(0, 100)
}

/// Round a value to the nearest multiple of `step`.
///
/// A step of zero leaves the value unchanged.
pub fn snap_to_step(value: i64, step: i64) -> i64 {
    if step <= 0 {
        return value;
    }
    // Round half away from zero so 2.5 steps land on the upper multiple
    let half = step / 2;
    let bias = if value >= 0 { half } else { -half };
    ((value + bias) / step) * step
}

/// Check whether `current` lies within `tolerance` of `target`.
///
/// Both band edges are clamped to the device scale so a target of 100 with
/// tolerance 5 still accepts a reading of 100.
pub fn within_tolerance(current: i64, target: i64, tolerance: i64) -> bool {
    let upper = clamp_percent(target + tolerance);
    let lower = clamp_percent(target - tolerance);
    current >= lower && current <= upper
}

/// Next control-tick boundary: the upcoming :00 or :30 second mark.
pub fn next_tick_boundary(now: DateTime<Local>) -> DateTime<Local> {
    let at_minute = now
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    if now.second() < 30 {
        at_minute + Duration::seconds(30)
    } else {
        at_minute + Duration::minutes(1)
    }
}
