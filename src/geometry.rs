//! Solar geometry: the sun-on-facade test, slat tilt and light-strip math.
//!
//! All angles are degrees. The tilt channel uses a percent scale where 100
//! means fully horizontal slats (most light) and 0 means fully closed; the
//! height channel uses 100 for fully open.

use crate::common::utils::{clamp_percent, snap_to_step};
use crate::config::{FacadeConfig, MoveConstraints, SlatConfig};

/// Signed deviation between the sun's azimuth and the facade normal,
/// folded to (-180, +180].
pub fn sun_deviation(azimuth: f64, facade_angle: i64) -> f64 {
    let mut diff = (azimuth - facade_angle as f64).rem_euclid(360.0);
    if diff > 180.0 {
        diff -= 360.0;
    }
    diff
}

/// Whether the facade is in sun: elevation within the configured band and
/// the sun bearing within the entry/exit window.
pub fn in_sun(azimuth: f64, elevation: f64, facade: &FacadeConfig) -> bool {
    if elevation < facade.min_elevation as f64 || elevation > facade.max_elevation as f64 {
        return false;
    }
    let diff = sun_deviation(azimuth, facade.facade_angle);
    diff >= facade.facade_offset_entry as f64 && diff <= facade.facade_offset_exit as f64
}

/// Effective slat width in mm, as seen from the sun's bearing.
///
/// When the sun stands directly in front of the facade the effective width
/// equals the configured width; as it strays sideways the slat's sun-facing
/// projection stretches by 1/cos of the deviation. Beyond 90° the sun is
/// behind the facade and the deviation is capped.
pub fn effective_slat_width(azimuth: f64, facade_angle: i64, slat_width: f64) -> f64 {
    let deviation = sun_deviation(azimuth, facade_angle).abs().min(90.0);
    if deviation == 0.0 {
        return slat_width;
    }
    let cos = deviation.to_radians().cos();
    if cos <= f64::EPSILON {
        // Sun parallel to the facade; projection degenerates
        return f64::INFINITY;
    }
    slat_width / cos
}

/// Minimum slat tilt (percent) that still blocks direct sun.
///
/// Solves the slat triangle: with slat distance `b` and effective width `c`,
/// the critical elevation `atan(b/c)` is where horizontal slats already
/// shade each other. Below it, the law of sines gives the closing angle.
pub fn slat_tilt_percent(
    elevation: f64,
    azimuth: f64,
    facade: &FacadeConfig,
    slats: &SlatConfig,
    moves: &MoveConstraints,
) -> i64 {
    // Sun below horizon or overhead: leave the slats horizontal
    if !(0.0..=90.0).contains(&elevation) {
        return moves.max_angle;
    }

    let b = slats.slat_distance;
    let c = effective_slat_width(azimuth, facade.facade_angle, slats.slat_width);
    if !c.is_finite() {
        return moves.max_angle;
    }

    let critical_elevation = (b / c).atan().to_degrees();
    if elevation >= critical_elevation {
        // Horizontal slats already suffice at this height of sun
        return moves.max_angle;
    }

    let sine = (b * elevation.to_radians().sin()) / c;
    if sine > 1.0 {
        // Sun too high for the geometry to close against
        return moves.max_angle;
    }
    let gamma = sine.asin().to_degrees();

    // Physical slat angle from horizontal, then onto the percent scale where
    // 0° (horizontal) = 100% and 90° (vertical) = 0%
    let slat_angle = (90.0 - gamma).round();
    let mut percent = (((90.0 - slat_angle) / 90.0) * 100.0).round() as i64;

    percent = clamp_percent(percent + slats.angle_offset);
    percent = snap_to_step(percent, moves.angle_step);
    percent.clamp(moves.min_angle, moves.max_angle)
}

/// Height (percent) that admits a strip of direct light at the sill.
///
/// `light_strip` is the admitted depth in mm, `total_height` the full cover
/// travel in mm. A missing or zero strip closes the cover fully.
pub fn light_strip_height(
    elevation: f64,
    light_strip: Option<f64>,
    total_height: Option<f64>,
    moves: &MoveConstraints,
) -> i64 {
    let strip = match light_strip {
        Some(s) if s > 0.0 => s,
        _ => return 0,
    };
    let total = match total_height {
        Some(t) if t > 0.0 => t,
        _ => return 0,
    };

    let height_mm = (strip * elevation.to_radians().tan()).round();
    let percent = 100 - ((height_mm * 100.0 / total).round() as i64);

    let percent = percent.clamp(moves.min_height, moves.max_height);
    snap_to_step(percent, moves.height_step)
}
