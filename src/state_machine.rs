//! Mode transitions driven by sun position, brightness and debounce timers.
//!
//! The mode space is a signed scale with Neutral at the origin, shadow
//! handling on the positive side and dawn handling on the negative side.
//! Every transition between two stable modes passes through a timer mode
//! that must survive its configured delay before the change commits; a
//! brightness reversal while the timer runs cancels the transition. This is
//! what keeps a passing cloud from cycling the motors.
//!
//! Shutters have no tilt channel, so they skip the horizontal rest modes:
//! their release timers drop straight back to Neutral.

use chrono::{DateTime, Local};

use crate::config::{Config, Delays, DeviceKind};
use crate::geometry;

/// Automation mode of one device. The discriminant is the scale position
/// and doubles as the snapshot encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum Mode {
    /// Blinds: slats opened flat, waiting to return to neutral.
    HorizontalToNeutralTimer = 5,
    /// Blinds: transitional rest with slats flat.
    Horizontal = 4,
    /// Leaving shadow; shutters release straight toward neutral.
    ShadowToHorizontalTimer = 3,
    Shadow = 2,
    NeutralToShadowTimer = 1,
    Neutral = 0,
    NeutralToDawnTimer = -1,
    Dawn = -2,
    /// Leaving dawn; shutters release straight toward neutral.
    DawnToHorizontalTimer = -3,
    /// Blinds: transitional rest with slats at the dawn horizontal angle.
    DawnHorizontal = -4,
    DawnHorizontalToNeutralTimer = -5,
}

impl Mode {
    /// Position on the signed scale, used for snapshots.
    pub fn scale(self) -> i8 {
        self as i8
    }

    /// Decode a snapshot value. Unknown values yield `None` and the caller
    /// falls back to Neutral.
    pub fn from_scale(value: i8) -> Option<Mode> {
        match value {
            5 => Some(Mode::HorizontalToNeutralTimer),
            4 => Some(Mode::Horizontal),
            3 => Some(Mode::ShadowToHorizontalTimer),
            2 => Some(Mode::Shadow),
            1 => Some(Mode::NeutralToShadowTimer),
            0 => Some(Mode::Neutral),
            -1 => Some(Mode::NeutralToDawnTimer),
            -2 => Some(Mode::Dawn),
            -3 => Some(Mode::DawnToHorizontalTimer),
            -4 => Some(Mode::DawnHorizontal),
            -5 => Some(Mode::DawnHorizontalToNeutralTimer),
            _ => None,
        }
    }

    /// Whether this mode carries a transition deadline.
    pub fn is_timer(self) -> bool {
        matches!(
            self,
            Mode::HorizontalToNeutralTimer
                | Mode::ShadowToHorizontalTimer
                | Mode::NeutralToShadowTimer
                | Mode::NeutralToDawnTimer
                | Mode::DawnToHorizontalTimer
                | Mode::DawnHorizontalToNeutralTimer
        )
    }
}

/// Per-tick transition inputs, assembled by the controller from its sensor
/// cache. Missing brightness readings leave both threshold comparisons
/// false, so the machine holds its mode.
#[derive(Debug, Clone, Copy)]
pub struct Conditions {
    pub in_sun: bool,
    pub shadow_active: bool,
    pub dawn_active: bool,
    pub brightness_shadow: Option<i64>,
    /// Dawn brightness, already resolved to the shadow sensor when no
    /// separate dawn sensor is configured.
    pub brightness_dawn: Option<i64>,
    pub shadow_threshold: i64,
    pub dawn_threshold: i64,
}

impl Conditions {
    fn shadow_above(&self) -> bool {
        self.brightness_shadow
            .is_some_and(|b| b > self.shadow_threshold)
    }

    fn shadow_below(&self) -> bool {
        self.brightness_shadow
            .is_some_and(|b| b < self.shadow_threshold)
    }

    fn dawn_above(&self) -> bool {
        self.brightness_dawn.is_some_and(|b| b > self.dawn_threshold)
    }

    fn dawn_below(&self) -> bool {
        self.brightness_dawn.is_some_and(|b| b < self.dawn_threshold)
    }
}

/// The hysteretic state machine: current mode plus the transition deadline.
#[derive(Debug)]
pub struct StateMachine {
    mode: Mode,
    deadline: Option<DateTime<Local>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            mode: Mode::Neutral,
            deadline: None,
        }
    }

    /// Resume from a restored snapshot.
    pub fn restored(mode: Mode, deadline: Option<DateTime<Local>>) -> Self {
        Self { mode, deadline }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn deadline(&self) -> Option<DateTime<Local>> {
        self.deadline
    }

    /// A missing deadline counts as expired: a timer mode restored without
    /// one commits on the next tick.
    fn timer_finished(&self, now: DateTime<Local>) -> bool {
        match self.deadline {
            None => true,
            Some(deadline) => deadline < now,
        }
    }

    fn arm(&mut self, now: DateTime<Local>, delay_secs: u64) {
        self.deadline = Some(now + chrono::Duration::seconds(delay_secs as i64));
        log_debug!("Timer armed, finishes at: {:?}", self.deadline);
    }

    fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Advance the machine by one tick. Returns the new mode.
    pub fn step(
        &mut self,
        cond: &Conditions,
        delays: &Delays,
        kind: DeviceKind,
        now: DateTime<Local>,
    ) -> Mode {
        let next = match self.mode {
            Mode::Neutral => self.from_neutral(cond, delays, now),
            Mode::NeutralToShadowTimer => self.from_neutral_to_shadow_timer(cond, now),
            Mode::Shadow => self.from_shadow(cond, delays, kind, now),
            Mode::ShadowToHorizontalTimer => {
                self.from_shadow_release_timer(cond, delays, kind, now)
            }
            Mode::Horizontal | Mode::HorizontalToNeutralTimer => {
                self.from_horizontal_release_timer(cond, now)
            }
            Mode::NeutralToDawnTimer => self.from_neutral_to_dawn_timer(cond, now),
            Mode::Dawn => self.from_dawn(cond, delays, kind, now),
            Mode::DawnToHorizontalTimer => self.from_dawn_release_timer(cond, delays, kind, now),
            Mode::DawnHorizontal | Mode::DawnHorizontalToNeutralTimer => {
                self.from_dawn_horizontal_release_timer(cond, now)
            }
        };

        if next != self.mode {
            log_debug!("Mode change: {:?} -> {:?}", self.mode, next);
        }
        self.mode = next;
        next
    }

    fn from_neutral(
        &mut self,
        cond: &Conditions,
        delays: &Delays,
        now: DateTime<Local>,
    ) -> Mode {
        if cond.dawn_active && cond.dawn_below() {
            self.arm(now, delays.neutral_to_dawn_delay);
            Mode::NeutralToDawnTimer
        } else if cond.in_sun && cond.shadow_active && cond.shadow_above() {
            self.arm(now, delays.neutral_to_shadow_delay);
            Mode::NeutralToShadowTimer
        } else {
            Mode::Neutral
        }
    }

    fn from_neutral_to_shadow_timer(&mut self, cond: &Conditions, now: DateTime<Local>) -> Mode {
        if !(cond.in_sun && cond.shadow_active) {
            self.cancel();
            return Mode::Neutral;
        }
        if cond.shadow_below() {
            // Brightness fell back before the delay elapsed
            self.cancel();
            Mode::Neutral
        } else if self.timer_finished(now) {
            self.cancel();
            Mode::Shadow
        } else {
            Mode::NeutralToShadowTimer
        }
    }

    fn from_shadow(
        &mut self,
        cond: &Conditions,
        delays: &Delays,
        kind: DeviceKind,
        now: DateTime<Local>,
    ) -> Mode {
        if !(cond.in_sun && cond.shadow_active) {
            return Mode::Neutral;
        }
        if cond.shadow_below() {
            let delay = match kind {
                DeviceKind::Blinds => delays.shadow_to_horizontal_delay,
                DeviceKind::Shutter => delays.shadow_to_neutral_delay,
            };
            self.arm(now, delay);
            Mode::ShadowToHorizontalTimer
        } else {
            Mode::Shadow
        }
    }

    fn from_shadow_release_timer(
        &mut self,
        cond: &Conditions,
        delays: &Delays,
        kind: DeviceKind,
        now: DateTime<Local>,
    ) -> Mode {
        if !(cond.in_sun && cond.shadow_active) {
            self.cancel();
            return Mode::Neutral;
        }
        if cond.shadow_above() {
            self.cancel();
            Mode::Shadow
        } else if self.timer_finished(now) {
            match kind {
                DeviceKind::Blinds => {
                    self.arm(now, delays.horizontal_to_neutral_delay);
                    Mode::HorizontalToNeutralTimer
                }
                // Shutters release straight to neutral. The stale deadline is
                // left in place on purpose; stable modes never read it and
                // re-entering a timer mode re-arms it.
                DeviceKind::Shutter => Mode::Neutral,
            }
        } else {
            Mode::ShadowToHorizontalTimer
        }
    }

    fn from_horizontal_release_timer(&mut self, cond: &Conditions, now: DateTime<Local>) -> Mode {
        if !(cond.in_sun && cond.shadow_active) {
            self.cancel();
            return Mode::Neutral;
        }
        if cond.shadow_above() {
            self.cancel();
            Mode::Shadow
        } else if self.timer_finished(now) {
            self.cancel();
            Mode::Neutral
        } else {
            Mode::HorizontalToNeutralTimer
        }
    }

    fn from_neutral_to_dawn_timer(&mut self, cond: &Conditions, now: DateTime<Local>) -> Mode {
        if !cond.dawn_active {
            self.cancel();
            return Mode::Neutral;
        }
        if cond.dawn_above() {
            self.cancel();
            Mode::Neutral
        } else if self.timer_finished(now) {
            self.cancel();
            Mode::Dawn
        } else {
            Mode::NeutralToDawnTimer
        }
    }

    fn from_dawn(
        &mut self,
        cond: &Conditions,
        delays: &Delays,
        kind: DeviceKind,
        now: DateTime<Local>,
    ) -> Mode {
        if !cond.dawn_active {
            return Mode::Neutral;
        }
        if cond.dawn_above() {
            let delay = match kind {
                DeviceKind::Blinds => delays.dawn_to_horizontal_delay,
                DeviceKind::Shutter => delays.dawn_to_neutral_delay,
            };
            self.arm(now, delay);
            Mode::DawnToHorizontalTimer
        } else {
            Mode::Dawn
        }
    }

    fn from_dawn_release_timer(
        &mut self,
        cond: &Conditions,
        delays: &Delays,
        kind: DeviceKind,
        now: DateTime<Local>,
    ) -> Mode {
        if !cond.dawn_active {
            self.cancel();
            return Mode::Neutral;
        }
        if cond.dawn_below() {
            self.cancel();
            Mode::Dawn
        } else if self.timer_finished(now) {
            match kind {
                DeviceKind::Blinds => {
                    self.arm(now, delays.dawn_horizontal_to_neutral_delay);
                    Mode::DawnHorizontalToNeutralTimer
                }
                // Same stale-deadline debounce as the shadow release
                DeviceKind::Shutter => Mode::Neutral,
            }
        } else {
            Mode::DawnToHorizontalTimer
        }
    }

    fn from_dawn_horizontal_release_timer(
        &mut self,
        cond: &Conditions,
        now: DateTime<Local>,
    ) -> Mode {
        if !cond.dawn_active {
            self.cancel();
            return Mode::Neutral;
        }
        if cond.dawn_below() {
            self.cancel();
            Mode::Dawn
        } else if self.timer_finished(now) {
            self.cancel();
            Mode::Neutral
        } else {
            Mode::DawnHorizontalToNeutralTimer
        }
    }
}

/// Working target position for the tick: produced raw by the mode mapping,
/// then rewritten by each constraint in turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub height: i64,
    /// Absent on the shutter variant.
    pub tilt: Option<i64>,
}

/// Map the current mode to its raw target position.
///
/// The shadow modes consult the geometry solver; everything else uses
/// configured rest positions. Sun coordinates are only read on the shadow
/// branch, which is unreachable while the sun is uncached (the machine
/// falls back to Neutral first).
pub fn mode_target(mode: Mode, config: &Config, azimuth: f64, elevation: f64) -> Target {
    let tilt = |angle: i64| config.kind.has_tilt().then_some(angle);

    match mode {
        Mode::Neutral | Mode::NeutralToShadowTimer | Mode::NeutralToDawnTimer => Target {
            height: config.neutral.neutral_height,
            tilt: tilt(config.neutral.neutral_angle),
        },
        Mode::Shadow | Mode::ShadowToHorizontalTimer => Target {
            height: shading_height(config, elevation),
            tilt: config.kind.has_tilt().then(|| {
                geometry::slat_tilt_percent(
                    elevation,
                    azimuth,
                    &config.facade,
                    &config.slats(),
                    &config.move_constraints,
                )
            }),
        },
        Mode::Horizontal | Mode::HorizontalToNeutralTimer => Target {
            height: config.shadow.shadow_height,
            tilt: tilt(config.shadow.shadow_horizontal_angle),
        },
        Mode::Dawn | Mode::DawnToHorizontalTimer => Target {
            height: config.dawn.dawn_height,
            tilt: tilt(config.dawn.dawn_angle),
        },
        Mode::DawnHorizontal | Mode::DawnHorizontalToNeutralTimer => Target {
            height: config.dawn.dawn_height,
            tilt: tilt(config.dawn.dawn_horizontal_angle),
        },
    }
}

/// Height used while actively shading.
///
/// Shutters derive it from the light strip. Blinds use the configured shadow
/// height unless the light-strip path is explicitly enabled.
fn shading_height(config: &Config, elevation: f64) -> i64 {
    let light_strip = || {
        geometry::light_strip_height(
            elevation,
            config.shadow.light_strip,
            config.shadow.total_height,
            &config.move_constraints,
        )
    };
    match config.kind {
        DeviceKind::Shutter => light_strip(),
        DeviceKind::Blinds if config.slats().use_light_strip => light_strip(),
        DeviceKind::Blinds => config.shadow.shadow_height,
    }
}
