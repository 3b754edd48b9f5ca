//! Distinguish automated cover movement from user or third-party overrides.
//!
//! Every settled telemetry event is correlated against the positions the
//! actuator last commanded. A match within tolerance confirms our own move;
//! anything else is treated as manual manipulation and raises a timed
//! external lock, published through the managed boolean so the operator can
//! see (and clear) it.

use chrono::{DateTime, Duration, Local};

use crate::actuator::{Actuator, Position};
use crate::common::utils::within_tolerance;
use crate::config::MoveConstraints;
use crate::host::{HostAdapter, STATE_OFF, STATE_ON};

/// Policy holds that gate the actuator, all externally visible as managed
/// booleans.
#[derive(Debug, Default)]
pub struct LockState {
    /// Operator's manual lock.
    pub manual: bool,
    /// Timed lock raised by the override detector.
    pub external: bool,
    /// Operator-held "leave it where it is".
    pub manipulation: bool,
    /// The solar-heating enable switch (not a hold, cached here with the
    /// other boolean entities).
    pub solar_heating_enabled: bool,
    /// Paired with `external`; reconciliation releases the lock when this
    /// is absent or in the past.
    pub external_deadline: Option<DateTime<Local>>,
}

impl LockState {
    /// Any hold that must stop the actuator.
    pub fn any_hold(&self) -> bool {
        self.manual || self.external || self.manipulation
    }
}

/// One cover telemetry event, as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverTelemetry {
    /// "opening"/"closing"/unknown/unavailable, ignored for correlation.
    Moving,
    /// The cover settled at a position.
    Settled {
        height: Option<i64>,
        tilt: Option<i64>,
    },
}

/// Release the external lock when its deadline is absent or has passed.
pub fn reconcile_external_lock(
    host: &dyn HostAdapter,
    locked_external_entity: &str,
    locks: &mut LockState,
    now: DateTime<Local>,
) {
    if !locks.external {
        return;
    }
    let release = match locks.external_deadline {
        None => {
            log_debug!("External lock has no deadline, releasing");
            true
        }
        Some(deadline) if now > deadline => {
            log_debug!("External lock expired, releasing");
            true
        }
        Some(_) => false,
    };
    if release {
        locks.external = false;
        locks.external_deadline = None;
        if let Err(err) = host.set_state(locked_external_entity, STATE_OFF) {
            log_error!("Could not release external lock entity: {err:#}");
        }
    }
}

/// Process one cover telemetry event.
///
/// Settled events update the cached position, advance the change counter and
/// either confirm the pending automated command or raise the external lock.
#[allow(clippy::too_many_arguments)]
pub fn handle_telemetry(
    host: &dyn HostAdapter,
    locked_external_entity: &str,
    moves: &MoveConstraints,
    counter_ceiling: i32,
    external_lock_minutes: i64,
    locks: &mut LockState,
    actuator: &mut Actuator,
    current: &mut Position,
    telemetry: CoverTelemetry,
    now: DateTime<Local>,
) {
    let (height, tilt) = match telemetry {
        CoverTelemetry::Moving => {
            actuator.moving = true;
            return;
        }
        CoverTelemetry::Settled { height, tilt } => (height, tilt),
    };

    actuator.moving = false;
    actuator.change_counter = actuator.change_counter.saturating_add(1);
    log_debug!("Cover settled, change counter: {}", actuator.change_counter);

    if height.is_some() {
        current.height = height;
    }
    if tilt.is_some() {
        current.tilt = tilt;
    }

    // A channel without an expectation (or without a reading to judge)
    // matches by definition
    let channel_matches = |observed: Option<i64>, expected: Option<i64>, tolerance: i64| match (
        observed, expected,
    ) {
        (Some(observed), Some(expected)) => within_tolerance(observed, expected, tolerance),
        _ => true,
    };

    let matches = channel_matches(height, actuator.expected_height, moves.height_tolerance)
        && channel_matches(tilt, actuator.expected_tilt, moves.angle_tolerance);

    if matches {
        if actuator.change_counter <= counter_ceiling {
            log_debug!("Telemetry matches the expected automated change");
            locks.external_deadline = None;
            reconcile_external_lock(host, locked_external_entity, locks, now);
        }
    } else if !locks.manipulation && !locks.manual {
        if !locks.external {
            // Flip the local state before telling the host; the host round
            // trip can lag and the next tick must already see the lock
            locks.external = true;
            locks.external_deadline = Some(now + Duration::minutes(external_lock_minutes));
            if let Err(err) = host.set_state(locked_external_entity, STATE_ON) {
                log_error!("Could not publish external lock entity: {err:#}");
            }
            log_block_start!(
                "Manual change detected, external lock until {:?}",
                locks.external_deadline
            );
        } else {
            log_debug!(
                "Already locked by external change until {:?}",
                locks.external_deadline
            );
        }
    }

    // The correlation window has closed
    if actuator.change_counter > counter_ceiling {
        actuator.expected_height = None;
        actuator.expected_tilt = None;
    }
}
