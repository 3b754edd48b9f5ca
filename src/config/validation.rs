//! Configuration validation functionality.
//!
//! Cross-field consistency checks run once at load time. Any violation is
//! fatal: the controller refuses to run rather than drive a motor from a
//! configuration that cannot mean what the operator intended.

use anyhow::Result;

use super::{Config, DeviceKind};

/// Comprehensive configuration validation to prevent impossible setups.
pub fn validate_config(config: &Config) -> Result<()> {
    if config.unique_id.is_empty() {
        anyhow::bail!("unique_id is mandatory (an identifier without spaces)");
    }
    if config.unique_id.contains(char::is_whitespace) {
        anyhow::bail!(
            "unique_id '{}' must not contain whitespace",
            config.unique_id
        );
    }

    if config.entities.cover.is_empty() {
        anyhow::bail!("entities.cover is mandatory");
    }
    if config.entities.brightness_shadow.is_empty() {
        anyhow::bail!("entities.brightness_shadow is mandatory");
    }

    // Facade geometry
    let facade = &config.facade;
    if !(0..360).contains(&facade.facade_angle) {
        anyhow::bail!(
            "facade.facade_angle ({}) must be a compass bearing in 0..360",
            facade.facade_angle
        );
    }
    if !(-180..=180).contains(&facade.facade_offset_entry)
        || !(-180..=180).contains(&facade.facade_offset_exit)
    {
        anyhow::bail!(
            "facade offsets ({}, {}) must lie within -180..=180 degrees",
            facade.facade_offset_entry,
            facade.facade_offset_exit
        );
    }
    if facade.facade_offset_entry >= facade.facade_offset_exit {
        anyhow::bail!(
            "facade.facade_offset_entry ({}) must be lower than facade.facade_offset_exit ({})",
            facade.facade_offset_entry,
            facade.facade_offset_exit
        );
    }
    if facade.min_elevation >= facade.max_elevation {
        anyhow::bail!(
            "facade.min_elevation ({}) must be lower than facade.max_elevation ({})",
            facade.min_elevation,
            facade.max_elevation
        );
    }

    // Movement constraints
    let moves = &config.move_constraints;
    if moves.min_height >= moves.max_height {
        anyhow::bail!(
            "move_constraints.min_height ({}) must be lower than max_height ({})",
            moves.min_height,
            moves.max_height
        );
    }
    if !(0..=100).contains(&moves.min_height) || !(0..=100).contains(&moves.max_height) {
        anyhow::bail!("move_constraints heights must lie within 0..=100 percent");
    }
    if moves.height_step < 0 || moves.height_tolerance < 0 {
        anyhow::bail!("move_constraints.height_step and height_tolerance must not be negative");
    }

    if config.kind.has_tilt() {
        if moves.min_angle >= moves.max_angle {
            anyhow::bail!(
                "move_constraints.min_angle ({}) must be lower than max_angle ({})",
                moves.min_angle,
                moves.max_angle
            );
        }
        if !(0..=100).contains(&moves.min_angle) || !(0..=100).contains(&moves.max_angle) {
            anyhow::bail!("move_constraints angles must lie within 0..=100 percent");
        }
        if moves.angle_step < 0 || moves.angle_tolerance < 0 {
            anyhow::bail!("move_constraints.angle_step and angle_tolerance must not be negative");
        }

        let slats = config.slats();
        if slats.slat_width <= 0.0 || slats.slat_distance <= 0.0 {
            anyhow::bail!(
                "blinds.slat_width ({}) and blinds.slat_distance ({}) must be positive millimetres",
                slats.slat_width,
                slats.slat_distance
            );
        }
    } else if config.blinds.is_some() {
        anyhow::bail!("a [blinds] section makes no sense for kind = \"shutter\"");
    }

    // Light-strip height math needs both measurements
    let wants_light_strip = config.kind == DeviceKind::Shutter
        || config.blinds.as_ref().is_some_and(|b| b.use_light_strip);
    if wants_light_strip {
        if let (Some(light_strip), Some(total)) =
            (config.shadow.light_strip, config.shadow.total_height)
        {
            if light_strip < 0.0 {
                anyhow::bail!("shadow.light_strip must not be negative");
            }
            if total <= 0.0 {
                anyhow::bail!("shadow.total_height must be positive");
            }
        } else if config.blinds.as_ref().is_some_and(|b| b.use_light_strip) {
            anyhow::bail!(
                "blinds.use_light_strip requires shadow.light_strip and shadow.total_height"
            );
        }
    }

    // Feature-gated entities
    if (config.ventilation_active || config.lockout_protection_active)
        && config.entities.window_sensor.is_none()
    {
        anyhow::bail!(
            "ventilation/lockout protection configured, but entities.window_sensor missing"
        );
    }

    if config.solar_heating_available {
        if config.entities.climate.is_none() {
            anyhow::bail!("solar heating configured, but entities.climate missing");
        }
        let solar = config
            .solar_heating
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!(
                "a [solar_heating] section is required when solar_heating_available is true"
            ))?;
        if solar.solar_heating_hysteresis < 0.0 {
            anyhow::bail!(
                "solar_heating.solar_heating_hysteresis ({}) must not be negative",
                solar.solar_heating_hysteresis
            );
        }
    }

    if config.external_lock_minutes <= 0 {
        anyhow::bail!(
            "external_lock_minutes ({}) must be positive",
            config.external_lock_minutes
        );
    }

    Ok(())
}
