//! Application constants and default values for sunshade.
//!
//! This module contains all the configuration defaults, validation limits,
//! and operational constants used throughout the application.

// # Facade Defaults
// The angular window around the facade normal in which the sun counts as
// "on the facade", and the usable elevation band.

pub const DEFAULT_FACADE_OFFSET_ENTRY: i64 = -90; // degrees relative to facade normal
pub const DEFAULT_FACADE_OFFSET_EXIT: i64 = 90; // degrees relative to facade normal
pub const DEFAULT_MIN_ELEVATION: i64 = 0; // degrees above horizon
pub const DEFAULT_MAX_ELEVATION: i64 = 90; // degrees above horizon

// # Movement Constraints
// Percent-scale limits, stepping and tolerances for the height and tilt
// channels. 100% height = fully open, 100% tilt = slats horizontal.

pub const DEFAULT_MIN_ANGLE: i64 = 0;
pub const DEFAULT_MAX_ANGLE: i64 = 100;
pub const DEFAULT_MIN_HEIGHT: i64 = 0;
pub const DEFAULT_MAX_HEIGHT: i64 = 100;
pub const DEFAULT_ANGLE_STEP: i64 = 5; // percent
pub const DEFAULT_HEIGHT_STEP: i64 = 5; // percent
pub const DEFAULT_ANGLE_TOLERANCE: i64 = 5; // percent
pub const DEFAULT_HEIGHT_TOLERANCE: i64 = 5; // percent

// # Slat Geometry Defaults (blinds only)

pub const DEFAULT_SLAT_WIDTH: f64 = 90.0; // mm
pub const DEFAULT_SLAT_DISTANCE: f64 = 80.0; // mm
pub const DEFAULT_ANGLE_OFFSET: i64 = 0; // percent added after tilt calculation

// # Rest / Mode Position Defaults

pub const DEFAULT_NEUTRAL_HEIGHT: i64 = 100; // fully open
pub const DEFAULT_NEUTRAL_ANGLE: i64 = 100; // slats horizontal
pub const DEFAULT_SHADOW_HEIGHT: i64 = 0;
pub const DEFAULT_SHADOW_HORIZONTAL_ANGLE: i64 = 100;
pub const DEFAULT_SHADOW_BRIGHTNESS_THRESHOLD: i64 = 50_000; // lux
pub const DEFAULT_LIGHT_STRIP: f64 = 500.0; // mm of admitted light at the sill
pub const DEFAULT_TOTAL_HEIGHT: f64 = 2000.0; // mm, full travel of the cover
pub const DEFAULT_DAWN_HEIGHT: i64 = 0;
pub const DEFAULT_DAWN_ANGLE: i64 = 0;
pub const DEFAULT_DAWN_HORIZONTAL_ANGLE: i64 = 0;
pub const DEFAULT_DAWN_BRIGHTNESS_THRESHOLD: i64 = 10; // lux

// # Transition Delays
// Seconds a brightness condition must hold before the corresponding mode
// change is committed. These debounce passing clouds and dawn flicker.

pub const DEFAULT_NEUTRAL_TO_SHADOW_DELAY: u64 = 165;
pub const DEFAULT_NEUTRAL_TO_DAWN_DELAY: u64 = 315;
pub const DEFAULT_SHADOW_TO_HORIZONTAL_DELAY: u64 = 615;
pub const DEFAULT_HORIZONTAL_TO_NEUTRAL_DELAY: u64 = 915;
pub const DEFAULT_DAWN_TO_HORIZONTAL_DELAY: u64 = 75;
pub const DEFAULT_DAWN_HORIZONTAL_TO_NEUTRAL_DELAY: u64 = 915;
pub const DEFAULT_SHADOW_TO_NEUTRAL_DELAY: u64 = 615; // shutter variant
pub const DEFAULT_DAWN_TO_NEUTRAL_DELAY: u64 = 915; // shutter variant

// # Locks and Override Detection

pub const DEFAULT_EXTERNAL_LOCK_MINUTES: i64 = 30;

/// Settled telemetry events after an automated command that still count as
/// confirmation of that command. Blinds produce two (height arrival, then
/// tilt arrival); shutters report intermediate positions and get more slack.
pub const BLINDS_CHANGE_COUNTER_CEILING: i32 = 2;
pub const SHUTTER_CHANGE_COUNTER_CEILING: i32 = 5;

/// Change-counter value meaning "no command has ever been issued". The
/// counter sits at 0 only between a successful command and the telemetry
/// that acknowledges it; the shutter actuator blocks on exactly that value.
pub const CHANGE_COUNTER_UNSET: i32 = -1;

// # Scheduling and Persistence

pub const TICK_INTERVAL_SECS: u64 = 30; // control tick period, aligned to :00/:30
pub const SNAPSHOT_MAX_AGE_MINUTES: i64 = 60; // older snapshots start fresh in Neutral
pub const SENSOR_RETRY_DELAY_SECS: u64 = 10; // one-shot retry at bootstrap

/// Height at and above which the blinds tilt is forced fully horizontal.
pub const FULLY_OPEN_HEIGHT: i64 = 95;

// # Host State Strings

pub const STATE_ON: &str = "on";
pub const STATE_OFF: &str = "off";
pub const STATE_UNKNOWN: &str = "unknown";
pub const STATE_UNAVAILABLE: &str = "unavailable";

// # Managed Entity Template

pub const ENTITY_TEMPLATE_FILENAME: &str = "entities.config";
