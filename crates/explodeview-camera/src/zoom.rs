//! Mapping between orbit distance and the 0-100% zoom shown to users.
//!
//! 0% is the farthest allowed distance and 100% the closest.

/// Converts an orbit distance to a zoom percentage.
///
/// The distance is clamped into `[min, max]` first. A degenerate range
/// (`max <= min`) always reports 0%.
#[must_use]
pub fn zoom_percent_from_distance(distance: f32, min: f32, max: f32) -> f32 {
    let range = max - min;
    if !(range > 0.0) {
        return 0.0;
    }
    let clamped = if distance.is_nan() {
        max
    } else {
        distance.clamp(min, max)
    };
    ((max - clamped) / range * 100.0).round()
}

/// Converts a zoom percentage back to an orbit distance.
///
/// The percentage is clamped into `[0, 100]`. A degenerate range returns `min`.
#[must_use]
pub fn distance_from_zoom_percent(percent: f32, min: f32, max: f32) -> f32 {
    let range = max - min;
    if !(range > 0.0) {
        return min;
    }
    let p = if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    };
    if p == 0.0 {
        return max;
    }
    if p == 100.0 {
        return min;
    }
    max - p / 100.0 * range
}
