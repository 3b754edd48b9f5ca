//! Policy constraints applied on top of the raw mode target.
//!
//! Each rule is a transformation of the working target, applied in ascending
//! priority: ventilation, solar heating, the post-dusk up-lock, lockout
//! protection, and finally the fully-open tilt coupling. Later rules may
//! overwrite what earlier ones decided for their channel.

use chrono::{DateTime, Local};

use crate::common::constants::FULLY_OPEN_HEIGHT;
use crate::common::utils::snap_to_step;
use crate::config::{DeviceKind, MoveConstraints, SolarHeatingConfig, VentilationConfig};
use crate::state_machine::Target;

/// Cached window-contact reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Open,
    Closed,
    /// The sensor reported itself unavailable; lockout protection treats
    /// this the same as an open window.
    Unavailable,
}

/// Clamp the target into the configured band and onto the step grid.
///
/// Runs on the raw mode target and again on configured override values, so
/// every position that reaches the actuator honours the movement
/// constraints. Rules that copy the current position are exempt; those
/// commands are tolerance-suppressed anyway.
pub fn normalize(target: &mut Target, moves: &MoveConstraints) {
    target.height = snap_to_step(
        target.height.clamp(moves.min_height, moves.max_height),
        moves.height_step,
    )
    .clamp(moves.min_height, moves.max_height);

    if let Some(tilt) = target.tilt {
        target.tilt = Some(
            snap_to_step(tilt.clamp(moves.min_angle, moves.max_angle), moves.angle_step)
                .clamp(moves.min_angle, moves.max_angle),
        );
    }
}

/// Ventilation: while the window is open, hold the configured partially-open
/// position.
///
/// Blinds take both channels unconditionally. Shutters only ever open
/// further: a ventilation height below the current position is ignored, and
/// so is an unknown current position.
pub fn apply_ventilation(
    kind: DeviceKind,
    window: Option<WindowState>,
    ventilation: &VentilationConfig,
    current_height: Option<i64>,
    target: &mut Target,
) {
    if window != Some(WindowState::Open) {
        return;
    }
    match kind {
        DeviceKind::Blinds => {
            if let Some(height) = ventilation.ventilation_height {
                target.height = height;
            }
            if let Some(angle) = ventilation.ventilation_angle
                && target.tilt.is_some()
            {
                target.tilt = Some(angle);
            }
        }
        DeviceKind::Shutter => {
            if let Some(height) = ventilation.ventilation_height
                && current_height.is_some_and(|current| current < height)
            {
                log_debug!(
                    "Ventilation opens shutter from {:?} to {}",
                    current_height,
                    height
                );
                target.height = height;
            }
        }
    }
}

/// Hysteretic solar-heating drive.
///
/// While the room is below the target temperature the cover is driven to the
/// heating position and the status mirror reads on. Once the target is
/// exceeded the drive latches off and only re-arms after the temperature
/// falls below `target - hysteresis`.
#[derive(Debug, Default)]
pub struct SolarHeating {
    hysteresis_latched: bool,
    status_on: bool,
}

impl SolarHeating {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_on(&self) -> bool {
        self.status_on
    }

    /// Evaluate one tick. Returns the drive position (if heating should
    /// control the cover) and a status transition to publish (if the status
    /// mirror changed).
    pub fn evaluate(
        &mut self,
        enabled: bool,
        temperature: Option<f64>,
        config: &SolarHeatingConfig,
    ) -> (Option<(i64, i64)>, Option<bool>) {
        if !enabled {
            return (None, self.set_status(false));
        }
        let Some(temperature) = temperature else {
            // No reading yet; hold whatever the other rules decided
            return (None, None);
        };

        let target = config.solar_heating_temperature;
        if temperature > target {
            self.hysteresis_latched = true;
            return (None, self.set_status(false));
        }

        if self.hysteresis_latched {
            if temperature < target - config.solar_heating_hysteresis {
                self.hysteresis_latched = false;
            } else {
                // Inside the hysteresis band: stay released
                return (None, None);
            }
        }

        let drive = (config.solar_heating_height, config.solar_heating_angle);
        (Some(drive), self.set_status(true))
    }

    fn set_status(&mut self, on: bool) -> Option<bool> {
        if self.status_on == on {
            None
        } else {
            self.status_on = on;
            Some(on)
        }
    }
}

/// Post-dusk up-lock: after the day's dusk the cover may not be raised.
///
/// Inactive until a dusk time has been seen from the sun entity.
pub fn apply_dusk_up_lock(
    enabled: bool,
    next_dusk: Option<DateTime<Local>>,
    now: DateTime<Local>,
    current_height: Option<i64>,
    target: &mut Target,
) {
    if !enabled {
        return;
    }
    let after_dusk = next_dusk.is_some_and(|dusk| dusk < now);
    if !after_dusk {
        return;
    }
    if let Some(current) = current_height
        && current < target.height
    {
        log_debug!("Past dusk, holding height at {current} instead of raising");
        target.height = current;
    }
}

/// Lockout protection: while the window is open (or its sensor is
/// unavailable) the cover may not be lowered past its current position.
pub fn apply_lockout_protection(
    enabled: bool,
    window: Option<WindowState>,
    current_height: Option<i64>,
    target: &mut Target,
) {
    if !enabled {
        return;
    }
    // A sensor that has never reported counts as unavailable
    let engaged = !matches!(window, Some(WindowState::Closed));
    if !engaged {
        return;
    }
    if let Some(current) = current_height
        && current > target.height
    {
        log_debug!("Lockout protection holds height at {current}");
        target.height = current;
    }
}

/// Fully-open tilt coupling (blinds): a nearly raised cover gets its slats
/// forced flat so the last bit of travel doesn't leave them angled.
pub fn apply_fully_open_coupling(target: &mut Target, moves: &MoveConstraints) {
    if target.tilt.is_some() && target.height >= FULLY_OPEN_HEIGHT {
        target.tilt = Some(100i64.clamp(moves.min_angle, moves.max_angle));
    }
}
