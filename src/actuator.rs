//! Command issue with tolerance suppression and expected-position tracking.
//!
//! The actuator is the only component that talks to the cover. It refuses to
//! act while any lock is held, suppresses commands that would move the cover
//! less than the configured tolerance, and records every successful command
//! as the expected position for the override detector to correlate against.

use crate::common::constants::CHANGE_COUNTER_UNSET;
use crate::common::utils::within_tolerance;
use crate::config::{DeviceKind, MoveConstraints};
use crate::host::HostAdapter;
use crate::override_detector::LockState;
use crate::state_machine::Target;

/// Last observed device position, one slot per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub height: Option<i64>,
    pub tilt: Option<i64>,
}

/// Tracks commanded-vs-confirmed movement for one cover.
#[derive(Debug)]
pub struct Actuator {
    /// Last successfully commanded height (or initial observation).
    pub expected_height: Option<i64>,
    /// Last successfully commanded tilt (blinds only).
    pub expected_tilt: Option<i64>,
    /// Settled telemetry events seen since the last command. Starts at the
    /// unset sentinel (-1); a successful command resets it to 0, which is
    /// the one value meaning "awaiting acknowledgement".
    pub change_counter: i32,
    /// The cover reported "opening"/"closing" and hasn't settled yet.
    pub moving: bool,
}

impl Actuator {
    /// Start tracking from the initial observation so the first telemetry
    /// event correlates instead of raising a lock.
    pub fn new(initial: Position) -> Self {
        Self {
            expected_height: initial.height,
            expected_tilt: initial.tilt,
            change_counter: CHANGE_COUNTER_UNSET,
            moving: false,
        }
    }

    /// Issue position (and tilt) commands for the resolved target.
    ///
    /// Locks make this a no-op before any comparison happens. Shutters
    /// additionally refuse while the device is between states or while a
    /// prior command is still unacknowledged.
    pub fn set_position(
        &mut self,
        host: &dyn HostAdapter,
        cover: &str,
        kind: DeviceKind,
        moves: &MoveConstraints,
        locks: &LockState,
        current: Position,
        target: &Target,
    ) {
        log_debug!("set_position called with {:?}", target);

        if kind == DeviceKind::Shutter {
            if self.moving {
                log_debug!("Cover still moving, not commanding a new position");
                return;
            }
            // Exactly 0 means a prior command is still unacknowledged by
            // telemetry; the unset sentinel (-1) commands freely
            if self.change_counter == 0 {
                log_debug!("Last position change still unacknowledged");
                return;
            }
        }

        if locks.any_hold() {
            return;
        }

        if !current
            .height
            .is_some_and(|h| within_tolerance(h, target.height, moves.height_tolerance))
        {
            match host.call_service(
                "cover/set_cover_position",
                cover,
                serde_json::json!({ "position": target.height }),
            ) {
                Ok(true) => {
                    log_debug!("Commanded height {}", target.height);
                    self.change_counter = 0;
                    self.expected_height = Some(target.height);
                }
                Ok(false) => {
                    log_error!("Could not set position to height {}", target.height);
                }
                Err(err) => {
                    log_error!("Height command failed: {err:#}");
                }
            }
        }

        let Some(tilt) = target.tilt else {
            return;
        };
        if !current
            .tilt
            .is_some_and(|t| within_tolerance(t, tilt, moves.angle_tolerance))
        {
            match host.call_service(
                "cover/set_cover_tilt_position",
                cover,
                serde_json::json!({ "tilt_position": tilt }),
            ) {
                Ok(true) => {
                    log_debug!("Commanded tilt {tilt}");
                    self.change_counter = 0;
                    self.expected_tilt = Some(tilt);
                }
                Ok(false) => {
                    log_error!("Could not set position to tilt {tilt}");
                }
                Err(err) => {
                    log_error!("Tilt command failed: {err:#}");
                }
            }
        }
    }
}
