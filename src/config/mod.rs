//! Configuration system for sunshade with validation and defaults.
//!
//! One TOML file describes one physical shading device. Most keys are
//! optional and fall back to the defaults in [`crate::common::constants`],
//! which mirror the values a typical exterior venetian blind or roller
//! shutter ships with.
//!
//! ## Configuration Structure
//!
//! ```toml
//! unique_id = "south_office"
//! name = "South office"
//! kind = "blinds"            # "blinds" (height + slat tilt) or "shutter" (height only)
//!
//! shadow_active = true
//! dawn_active = true
//! ventilation_active = false
//! lockout_protection_active = false
//! solar_heating_available = false
//! external_lock_minutes = 30
//! save_states = true
//!
//! [entities]
//! cover = "cover.south_office"
//! brightness_shadow = "sensor.south_lux"
//! brightness_dawn = "sensor.east_lux"       # optional, falls back to brightness_shadow
//! window_sensor = "binary_sensor.south_window"
//! climate = "climate.office"
//!
//! [facade]
//! facade_angle = 180         # compass bearing of the outward facade normal
//! facade_offset_entry = -90  # sun enters the facade at normal - 90
//! facade_offset_exit = 90    # and leaves at normal + 90
//! min_elevation = 0
//! max_elevation = 90
//!
//! [move_constraints]
//! min_height = 0
//! max_height = 100
//! height_step = 5
//! height_tolerance = 5
//! min_angle = 0              # tilt channel, blinds only
//! max_angle = 100
//! angle_step = 5
//! angle_tolerance = 5
//!
//! [blinds]                   # blinds only
//! slat_width = 90            # mm
//! slat_distance = 80         # mm
//! angle_offset = 0
//! use_light_strip = false    # derive shadow height from the light strip instead
//!
//! [shadow]
//! shadow_height = 0
//! shadow_horizontal_angle = 100
//! shadow_brightness_threshold = 50000
//! # shadow_brightness_threshold_entity = "input_number.sunshine_threshold"
//! light_strip = 500          # mm of admitted light at the sill (shutter)
//! total_height = 2000        # mm of full cover travel (shutter)
//!
//! [dawn]
//! dawn_height = 0
//! dawn_angle = 0
//! dawn_horizontal_angle = 0
//! dawn_brightness_threshold = 10
//! dawn_prevent_move_up_after_dusk = true
//!
//! [delays]
//! neutral_to_shadow_delay = 165
//! neutral_to_dawn_delay = 315
//! shadow_to_horizontal_delay = 615
//! horizontal_to_neutral_delay = 915
//! dawn_to_horizontal_delay = 75
//! dawn_horizontal_to_neutral_delay = 915
//! shadow_to_neutral_delay = 615    # shutter
//! dawn_to_neutral_delay = 915      # shutter
//!
//! [ventilation]
//! ventilation_height = 30
//! ventilation_angle = 50
//!
//! [solar_heating]
//! solar_heating_temperature = 21.5
//! solar_heating_hysteresis = 0.5
//! solar_heating_height = 100
//! solar_heating_angle = 100
//! ```
//!
//! ## Validation and Error Handling
//!
//! Cross-field consistency is enforced at load time: entry < exit offsets,
//! min < max for elevation/height/angle, required entities per active
//! feature, positive steps. Invalid configurations are fatal: the
//! controller refuses to run (see [`validation`]).

pub mod loading;
pub mod validation;

use serde::Deserialize;

use crate::common::constants::*;

// Re-export public API
pub use loading::{load_from_path, load_from_str};
pub use validation::validate_config;

/// Device variant: which channels the cover exposes.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Venetian blinds: height plus slat tilt.
    Blinds,
    /// Roller shutter: height only.
    Shutter,
}

impl DeviceKind {
    /// Token used in managed entity ids.
    pub fn token(&self) -> &'static str {
        match self {
            DeviceKind::Blinds => "blinds",
            DeviceKind::Shutter => "shutter",
        }
    }

    /// Human-readable label for logs and entity friendly names.
    pub fn display(&self) -> &'static str {
        match self {
            DeviceKind::Blinds => "Blinds",
            DeviceKind::Shutter => "Shutter",
        }
    }

    /// Whether the device has a slat-tilt channel.
    pub fn has_tilt(&self) -> bool {
        matches!(self, DeviceKind::Blinds)
    }

    /// Settled telemetry events that still confirm an automated command.
    pub fn change_counter_ceiling(&self) -> i32 {
        match self {
            DeviceKind::Blinds => BLINDS_CHANGE_COUNTER_CEILING,
            DeviceKind::Shutter => SHUTTER_CHANGE_COUNTER_CEILING,
        }
    }
}

/// Entity ids of the sensors and the cover this controller consumes.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct EntitiesConfig {
    /// The cover entity being driven.
    #[serde(default)]
    pub cover: String,
    /// Brightness sensor (lux) for shadow decisions.
    #[serde(default)]
    pub brightness_shadow: String,
    /// Optional separate brightness sensor for dawn decisions.
    pub brightness_dawn: Option<String>,
    /// Window contact, "on" = open. Required by ventilation and lockout.
    pub window_sensor: Option<String>,
    /// Climate entity carrying `current_temperature`. Required by solar heating.
    pub climate: Option<String>,
    /// Sun entity carrying `azimuth`, `elevation` and `next_dusk`.
    #[serde(default = "default_sun_entity")]
    pub sun: String,
}

fn default_sun_entity() -> String {
    "sun.sun".to_string()
}

/// Facade orientation and the angular window in which the sun hits it.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FacadeConfig {
    /// Compass bearing (degrees) of the outward facade normal.
    pub facade_angle: i64,
    #[serde(default = "d_offset_entry")]
    pub facade_offset_entry: i64,
    #[serde(default = "d_offset_exit")]
    pub facade_offset_exit: i64,
    #[serde(default = "d_min_elevation")]
    pub min_elevation: i64,
    #[serde(default = "d_max_elevation")]
    pub max_elevation: i64,
}

fn d_offset_entry() -> i64 {
    DEFAULT_FACADE_OFFSET_ENTRY
}
fn d_offset_exit() -> i64 {
    DEFAULT_FACADE_OFFSET_EXIT
}
fn d_min_elevation() -> i64 {
    DEFAULT_MIN_ELEVATION
}
fn d_max_elevation() -> i64 {
    DEFAULT_MAX_ELEVATION
}

/// Percent-scale limits, stepping and tolerances for both channels.
///
/// The angle fields only matter for blinds; shutters ignore them.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct MoveConstraints {
    pub min_height: i64,
    pub max_height: i64,
    pub height_step: i64,
    pub height_tolerance: i64,
    pub min_angle: i64,
    pub max_angle: i64,
    pub angle_step: i64,
    pub angle_tolerance: i64,
}

impl Default for MoveConstraints {
    fn default() -> Self {
        Self {
            min_height: DEFAULT_MIN_HEIGHT,
            max_height: DEFAULT_MAX_HEIGHT,
            height_step: DEFAULT_HEIGHT_STEP,
            height_tolerance: DEFAULT_HEIGHT_TOLERANCE,
            min_angle: DEFAULT_MIN_ANGLE,
            max_angle: DEFAULT_MAX_ANGLE,
            angle_step: DEFAULT_ANGLE_STEP,
            angle_tolerance: DEFAULT_ANGLE_TOLERANCE,
        }
    }
}

/// Slat geometry of the blinds variant.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct SlatConfig {
    /// Width of one slat in mm.
    pub slat_width: f64,
    /// Vertical distance between two slats in mm.
    pub slat_distance: f64,
    /// Percent added to every calculated tilt (motor calibration).
    pub angle_offset: i64,
    /// Derive the shadow height from the light-strip formula instead of
    /// using the configured shadow height.
    pub use_light_strip: bool,
}

impl Default for SlatConfig {
    fn default() -> Self {
        Self {
            slat_width: DEFAULT_SLAT_WIDTH,
            slat_distance: DEFAULT_SLAT_DISTANCE,
            angle_offset: DEFAULT_ANGLE_OFFSET,
            use_light_strip: false,
        }
    }
}

/// Rest position used by Neutral and its adjacent timer states.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct NeutralConfig {
    pub neutral_height: i64,
    pub neutral_angle: i64,
}

impl Default for NeutralConfig {
    fn default() -> Self {
        Self {
            neutral_height: DEFAULT_NEUTRAL_HEIGHT,
            neutral_angle: DEFAULT_NEUTRAL_ANGLE,
        }
    }
}

/// Shadow-mode positions and the brightness threshold that triggers them.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct ShadowConfig {
    pub shadow_height: i64,
    /// Tilt used while easing out of shadow (blinds).
    pub shadow_horizontal_angle: i64,
    /// Static threshold in lux, used unless a threshold entity is configured.
    pub shadow_brightness_threshold: i64,
    /// Live sensor overriding the static threshold.
    pub shadow_brightness_threshold_entity: Option<String>,
    /// mm of direct light admitted at the sill (light-strip height math).
    pub light_strip: Option<f64>,
    /// mm of full cover travel (light-strip height math).
    pub total_height: Option<f64>,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            shadow_height: DEFAULT_SHADOW_HEIGHT,
            shadow_horizontal_angle: DEFAULT_SHADOW_HORIZONTAL_ANGLE,
            shadow_brightness_threshold: DEFAULT_SHADOW_BRIGHTNESS_THRESHOLD,
            shadow_brightness_threshold_entity: None,
            light_strip: Some(DEFAULT_LIGHT_STRIP),
            total_height: Some(DEFAULT_TOTAL_HEIGHT),
        }
    }
}

/// Dawn-mode (privacy) positions and trigger threshold.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct DawnConfig {
    pub dawn_height: i64,
    pub dawn_angle: i64,
    /// Tilt used while easing out of dawn (blinds).
    pub dawn_horizontal_angle: i64,
    pub dawn_brightness_threshold: i64,
    /// After the day's dusk, never raise the cover above its current height.
    pub dawn_prevent_move_up_after_dusk: bool,
}

impl Default for DawnConfig {
    fn default() -> Self {
        Self {
            dawn_height: DEFAULT_DAWN_HEIGHT,
            dawn_angle: DEFAULT_DAWN_ANGLE,
            dawn_horizontal_angle: DEFAULT_DAWN_HORIZONTAL_ANGLE,
            dawn_brightness_threshold: DEFAULT_DAWN_BRIGHTNESS_THRESHOLD,
            dawn_prevent_move_up_after_dusk: true,
        }
    }
}

/// Debounce delays (seconds) for every named transition.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct Delays {
    pub neutral_to_shadow_delay: u64,
    pub neutral_to_dawn_delay: u64,
    pub shadow_to_horizontal_delay: u64,
    pub horizontal_to_neutral_delay: u64,
    pub dawn_to_horizontal_delay: u64,
    pub dawn_horizontal_to_neutral_delay: u64,
    /// Shutter variant: shadow releases straight to neutral.
    pub shadow_to_neutral_delay: u64,
    /// Shutter variant: dawn releases straight to neutral.
    pub dawn_to_neutral_delay: u64,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            neutral_to_shadow_delay: DEFAULT_NEUTRAL_TO_SHADOW_DELAY,
            neutral_to_dawn_delay: DEFAULT_NEUTRAL_TO_DAWN_DELAY,
            shadow_to_horizontal_delay: DEFAULT_SHADOW_TO_HORIZONTAL_DELAY,
            horizontal_to_neutral_delay: DEFAULT_HORIZONTAL_TO_NEUTRAL_DELAY,
            dawn_to_horizontal_delay: DEFAULT_DAWN_TO_HORIZONTAL_DELAY,
            dawn_horizontal_to_neutral_delay: DEFAULT_DAWN_HORIZONTAL_TO_NEUTRAL_DELAY,
            shadow_to_neutral_delay: DEFAULT_SHADOW_TO_NEUTRAL_DELAY,
            dawn_to_neutral_delay: DEFAULT_DAWN_TO_NEUTRAL_DELAY,
        }
    }
}

/// Positions forced while the window is open and ventilation is active.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields, default)]
pub struct VentilationConfig {
    pub ventilation_height: Option<i64>,
    pub ventilation_angle: Option<i64>,
}

/// Solar-heating drive position and the temperature band around the target.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SolarHeatingConfig {
    /// Indoor target temperature in degrees Celsius.
    pub solar_heating_temperature: f64,
    /// Re-arm only after the temperature drops this far below the target.
    pub solar_heating_hysteresis: f64,
    pub solar_heating_height: i64,
    /// Tilt while heating (blinds).
    #[serde(default = "d_solar_angle")]
    pub solar_heating_angle: i64,
}

fn d_solar_angle() -> i64 {
    DEFAULT_MAX_ANGLE
}

/// Configuration of one shading device, immutable after construction.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Identifier without spaces; used in managed entity ids and the
    /// snapshot filename.
    pub unique_id: String,
    /// Display name for logs and entity friendly names. Falls back to the
    /// unique id.
    pub name: Option<String>,
    pub kind: DeviceKind,

    #[serde(default = "d_true")]
    pub shadow_active: bool,
    #[serde(default = "d_true")]
    pub dawn_active: bool,
    #[serde(default)]
    pub ventilation_active: bool,
    #[serde(default)]
    pub lockout_protection_active: bool,
    #[serde(default)]
    pub solar_heating_available: bool,
    #[serde(default)]
    pub save_states: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "d_external_lock_minutes")]
    pub external_lock_minutes: i64,

    pub entities: EntitiesConfig,
    pub facade: FacadeConfig,
    #[serde(default)]
    pub move_constraints: MoveConstraints,
    #[serde(default)]
    pub blinds: Option<SlatConfig>,
    #[serde(default)]
    pub neutral: NeutralConfig,
    #[serde(default)]
    pub shadow: ShadowConfig,
    #[serde(default)]
    pub dawn: DawnConfig,
    #[serde(default)]
    pub delays: Delays,
    #[serde(default)]
    pub ventilation: VentilationConfig,
    #[serde(default)]
    pub solar_heating: Option<SolarHeatingConfig>,
}

fn d_true() -> bool {
    true
}

fn d_external_lock_minutes() -> i64 {
    DEFAULT_EXTERNAL_LOCK_MINUTES
}

impl Config {
    /// Display name for logs.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.unique_id)
    }

    /// Slat configuration, defaulted for the blinds variant.
    pub fn slats(&self) -> SlatConfig {
        self.blinds.clone().unwrap_or_default()
    }

    pub fn log_config(&self) {
        log_block_start!(
            "Loaded configuration for {} '{}'",
            self.kind.token(),
            self.display_name()
        );
        log_indented!("Cover: {}", self.entities.cover);
        log_indented!(
            "Facade: {}° (entry {:+}°, exit {:+}°, elevation {}°–{}°)",
            self.facade.facade_angle,
            self.facade.facade_offset_entry,
            self.facade.facade_offset_exit,
            self.facade.min_elevation,
            self.facade.max_elevation
        );
        log_indented!(
            "Shadow: {} (threshold {} lx)",
            if self.shadow_active { "active" } else { "off" },
            self.shadow.shadow_brightness_threshold
        );
        log_indented!(
            "Dawn: {} (threshold {} lx)",
            if self.dawn_active { "active" } else { "off" },
            self.dawn.dawn_brightness_threshold
        );
        if self.ventilation_active {
            log_indented!("Ventilation active");
        }
        if self.lockout_protection_active {
            log_indented!("Lockout protection active");
        }
        if let Some(solar) = &self.solar_heating {
            log_indented!(
                "Solar heating: target {:.1}°C, hysteresis {:.1}°C",
                solar.solar_heating_temperature,
                solar.solar_heating_hysteresis
            );
        }
    }
}

#[cfg(test)]
mod tests;
