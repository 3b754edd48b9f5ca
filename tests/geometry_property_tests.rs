//! Property-based checks of the solar geometry.

use proptest::prelude::*;

use sunshade::config::{FacadeConfig, MoveConstraints, SlatConfig};
use sunshade::geometry::{light_strip_height, slat_tilt_percent, sun_deviation};

fn south_facade() -> FacadeConfig {
    FacadeConfig {
        facade_angle: 180,
        facade_offset_entry: -90,
        facade_offset_exit: 90,
        min_elevation: 0,
        max_elevation: 90,
    }
}

proptest! {
    /// The signed deviation always lands in (-180, +180], for any azimuth
    /// and any facade bearing.
    #[test]
    fn sun_deviation_stays_in_signed_half_circle(
        azimuth in 0.0f64..360.0,
        facade_angle in 0i64..360,
    ) {
        let deviation = sun_deviation(azimuth, facade_angle);
        prop_assert!(deviation > -180.0);
        prop_assert!(deviation <= 180.0);
    }

    /// Whatever the sun does, the tilt stays inside the movement
    /// constraints and on the step grid.
    #[test]
    fn slat_tilt_honours_constraints(
        elevation in -20.0f64..110.0,
        azimuth in 0.0f64..360.0,
    ) {
        let moves = MoveConstraints::default();
        let tilt = slat_tilt_percent(
            elevation,
            azimuth,
            &south_facade(),
            &SlatConfig::default(),
            &moves,
        );
        prop_assert!(tilt >= moves.min_angle);
        prop_assert!(tilt <= moves.max_angle);
        prop_assert_eq!(tilt % moves.angle_step, 0);
    }

    /// Light-strip heights respect the band and the step grid too.
    #[test]
    fn light_strip_height_honours_constraints(
        elevation in 0.0f64..90.0,
        strip in 0.0f64..2000.0,
        total in 100.0f64..5000.0,
    ) {
        let moves = MoveConstraints::default();
        let height = light_strip_height(elevation, Some(strip), Some(total), &moves);
        prop_assert!(height >= moves.min_height);
        prop_assert!(height <= moves.max_height);
        prop_assert_eq!(height % moves.height_step, 0);
    }

    /// Tilt is monotone in elevation below the critical angle: a lower sun
    /// never gets a more open slat than a higher one.
    #[test]
    fn slat_tilt_monotone_in_elevation(
        low in 1.0f64..30.0,
        delta in 0.0f64..10.0,
    ) {
        let moves = MoveConstraints::default();
        let facade = south_facade();
        let slats = SlatConfig::default();
        let tilt_low = slat_tilt_percent(low, 180.0, &facade, &slats, &moves);
        let tilt_high = slat_tilt_percent(low + delta, 180.0, &facade, &slats, &moves);
        prop_assert!(tilt_low <= tilt_high);
    }
}
