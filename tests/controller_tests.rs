//! End-to-end controller scenarios against an in-memory host.

mod common;

use chrono::{DateTime, Duration, Local, TimeZone};
use std::sync::Arc;
use tempfile::TempDir;

use common::FakeHost;
use sunshade::controller::{Controller, Startup};
use sunshade::host::StateValue;
use sunshade::time_source::{ManualTimeSource, TimeSource};
use sunshade::{Log, Mode};

fn start_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn blinds_toml(extra_top: &str, extra_sections: &str) -> String {
    format!(
        r#"
unique_id = "south"
kind = "blinds"
{extra_top}

[entities]
cover = "cover.south"
brightness_shadow = "sensor.south_lux"
window_sensor = "binary_sensor.south_window"

[facade]
facade_angle = 180

{extra_sections}
"#
    )
}

fn shutter_toml() -> String {
    r#"
unique_id = "kitchen"
kind = "shutter"

[entities]
cover = "cover.kitchen"
brightness_shadow = "sensor.west_lux"

[facade]
facade_angle = 180
"#
    .to_string()
}

struct Rig {
    controller: Box<Controller>,
    host: Arc<FakeHost>,
    clock: Arc<ManualTimeSource>,
    _app_dir: TempDir,
}

/// Sunny noon: sun straight on the facade at 40° elevation, 60 klx.
fn populate_blinds_host(host: &FakeHost, brightness: i64, position: i64, tilt: i64) {
    host.put_attribute("cover.south", "current_position", StateValue::Number(position as f64));
    host.put_attribute(
        "cover.south",
        "current_tilt_position",
        StateValue::Number(tilt as f64),
    );
    host.put_state("sensor.south_lux", StateValue::Number(brightness as f64));
    host.put_state("binary_sensor.south_window", StateValue::Text("off".into()));
    host.put_attribute("sun.sun", "azimuth", StateValue::Number(180.0));
    host.put_attribute("sun.sun", "elevation", StateValue::Number(40.0));
    host.put_attribute(
        "sun.sun",
        "next_dusk",
        StateValue::Text((start_time() + Duration::hours(9)).to_rfc3339()),
    );
    host.register_boolean("input_boolean.south_blinds_locked");
    host.register_boolean("input_boolean.south_blinds_locked_external");
    host.register_boolean("input_boolean.south_manipulation_active");
}

fn rig(toml: &str, configure: impl FnOnce(&FakeHost)) -> Rig {
    Log::set_enabled(false);
    let app_dir = TempDir::new().unwrap();
    let host = FakeHost::new(app_dir.path().to_path_buf());
    configure(&host);
    let clock = ManualTimeSource::new(start_time());

    let config = sunshade::config::load_from_str(toml).unwrap();
    let controller = match Controller::bootstrap(config, host.clone(), clock.clone()).unwrap() {
        Startup::Ready(controller) => controller,
        Startup::NeedsOperatorSetup { .. } => panic!("managed entities should exist"),
    };

    Rig {
        controller,
        host,
        clock,
        _app_dir: app_dir,
    }
}

fn blinds_rig() -> Rig {
    rig(&blinds_toml("", ""), |host| {
        populate_blinds_host(host, 60_000, 100, 100)
    })
}

#[test]
fn shadow_entry_arms_timer_then_commands_position() {
    let mut rig = blinds_rig();
    assert_eq!(rig.controller.mode(), Mode::Neutral);

    rig.controller.tick();
    assert_eq!(rig.controller.mode(), Mode::NeutralToShadowTimer);
    assert_eq!(
        rig.controller.transition_deadline(),
        Some(start_time() + Duration::seconds(165))
    );
    // Neutral target equals the current position: nothing commanded yet
    assert!(rig.host.calls().is_empty());

    rig.clock.advance_secs(166);
    rig.controller.tick();
    assert_eq!(rig.controller.mode(), Mode::Shadow);

    // Height drops to the shadow height, tilt comes from the slat solver
    assert_eq!(rig.host.position_calls(), vec![0]);
    assert_eq!(rig.host.tilt_calls(), vec![40]);
    assert_eq!(rig.controller.expected_position().height, Some(0));
    assert_eq!(rig.controller.expected_position().tilt, Some(40));
}

#[test]
fn shadow_timer_debounces_a_passing_cloud() {
    let mut rig = blinds_rig();
    rig.controller.tick();
    assert_eq!(rig.controller.mode(), Mode::NeutralToShadowTimer);

    rig.controller
        .on_brightness_shadow_change(StateValue::Number(40_000.0));
    rig.clock.advance_secs(60);
    rig.controller.tick();

    assert_eq!(rig.controller.mode(), Mode::Neutral);
    assert_eq!(rig.controller.transition_deadline(), None);
    assert!(rig.host.calls().is_empty());
}

#[test]
fn dawn_full_cycle() {
    let mut rig = rig(&blinds_toml("", ""), |host| {
        populate_blinds_host(host, 5, 100, 100)
    });

    rig.controller.tick();
    assert_eq!(rig.controller.mode(), Mode::NeutralToDawnTimer);
    assert_eq!(
        rig.controller.transition_deadline(),
        Some(start_time() + Duration::seconds(315))
    );

    rig.clock.advance_secs(316);
    rig.controller.tick();
    assert_eq!(rig.controller.mode(), Mode::Dawn);
    assert_eq!(rig.host.position_calls(), vec![0]);
    assert_eq!(rig.host.tilt_calls(), vec![0]);

    // Light returns: ease back out through the horizontal timers
    rig.host.clear_calls();
    rig.controller
        .on_brightness_shadow_change(StateValue::Number(20.0));

    rig.clock.advance_secs(84); // t = 400
    rig.controller.tick();
    assert_eq!(rig.controller.mode(), Mode::DawnToHorizontalTimer);

    rig.clock.advance_secs(76); // t = 476, past the 75 s dawn release delay
    rig.controller.tick();
    assert_eq!(rig.controller.mode(), Mode::DawnHorizontalToNeutralTimer);

    rig.clock.advance_secs(916); // past the 915 s horizontal release delay
    rig.controller.tick();
    assert_eq!(rig.controller.mode(), Mode::Neutral);
}

#[test]
fn fully_open_height_forces_flat_slats() {
    let toml = blinds_toml("", "[neutral]\nneutral_height = 100\nneutral_angle = 40\n");
    let mut rig = rig(&toml, |host| populate_blinds_host(host, 1_000, 50, 50));

    rig.controller.tick();
    assert_eq!(rig.controller.mode(), Mode::Neutral);
    assert_eq!(rig.host.position_calls(), vec![100]);
    // Neutral would ask for 40, the fully-open coupling overrides to 100
    assert_eq!(rig.host.tilt_calls(), vec![100]);
}

#[test]
fn lockout_protection_keeps_height_while_window_open() {
    let toml = blinds_toml("lockout_protection_active = true", "");
    let mut rig = rig(&toml, |host| {
        populate_blinds_host(host, 60_000, 100, 100);
        host.put_state("binary_sensor.south_window", StateValue::Text("on".into()));
    });

    rig.controller.tick();
    rig.clock.advance_secs(166);
    rig.controller.tick();
    assert_eq!(rig.controller.mode(), Mode::Shadow);

    // Height is held at the current 100; only the tilt channel moves
    assert!(rig.host.position_calls().is_empty());
    assert_eq!(rig.host.tilt_calls(), vec![40]);
}

#[test]
fn ventilation_applies_immediately_on_window_open() {
    let toml = blinds_toml(
        "ventilation_active = true",
        "[ventilation]\nventilation_height = 30\nventilation_angle = 50\n",
    );
    let mut rig = rig(&toml, |host| populate_blinds_host(host, 1_000, 50, 80));

    rig.controller
        .on_window_change(StateValue::Text("on".into()));

    assert_eq!(rig.host.position_calls(), vec![30]);
    assert_eq!(rig.host.tilt_calls(), vec![50]);
}

#[test]
fn mismatched_telemetry_raises_timed_external_lock() {
    let mut rig = blinds_rig();

    // Drive into shadow so a command is pending
    rig.controller.tick();
    rig.clock.advance_secs(166);
    rig.controller.tick();
    assert_eq!(rig.controller.expected_position().height, Some(0));
    rig.host.clear_calls();

    // Telemetry settles far away from the commanded position
    rig.controller.on_cover_change(
        StateValue::Text("open".into()),
        StateValue::Number(80.0),
        StateValue::Number(100.0),
    );

    assert!(rig.controller.locks().external);
    assert_eq!(
        rig.controller.locks().external_deadline,
        Some(rig.clock.now() + Duration::minutes(30))
    );
    assert_eq!(
        rig.host
            .state_text("input_boolean.south_blinds_locked_external")
            .as_deref(),
        Some("on")
    );

    // While locked: no commands at all
    rig.controller.tick();
    assert!(rig.host.calls().is_empty());

    // After the lock window elapses the tick releases it and resumes control
    rig.clock.advance_secs(31 * 60);
    rig.controller.tick();
    assert!(!rig.controller.locks().external);
    assert_eq!(
        rig.host
            .state_text("input_boolean.south_blinds_locked_external")
            .as_deref(),
        Some("off")
    );
    assert_eq!(rig.host.position_calls(), vec![0]);
}

#[test]
fn matching_telemetry_makes_further_ticks_idempotent() {
    let mut rig = blinds_rig();
    rig.controller.tick();
    rig.clock.advance_secs(166);
    rig.controller.tick();
    assert_eq!(rig.host.position_calls(), vec![0]);

    // The cover reports arrival at the commanded position
    rig.controller.on_cover_change(
        StateValue::Text("open".into()),
        StateValue::Number(0.0),
        StateValue::Number(40.0),
    );
    assert!(!rig.controller.locks().external);
    rig.host.clear_calls();

    rig.clock.advance_secs(30);
    rig.controller.tick();
    rig.clock.advance_secs(30);
    rig.controller.tick();

    assert_eq!(rig.controller.mode(), Mode::Shadow);
    assert!(rig.host.calls().is_empty());
}

#[test]
fn manual_lock_stops_all_commands() {
    let mut rig = blinds_rig();
    rig.controller.on_lock_entity_change(
        "input_boolean.south_blinds_locked",
        StateValue::Text("on".into()),
    );

    rig.controller.tick();
    rig.clock.advance_secs(166);
    rig.controller.tick();

    // The machine still advances, but nothing reaches the cover
    assert_eq!(rig.controller.mode(), Mode::Shadow);
    assert!(rig.host.calls().is_empty());
}

#[test]
fn snapshot_round_trip_restores_mode_and_timer() {
    let toml = blinds_toml("save_states = true", "");
    let mut rig = rig(&toml, |host| populate_blinds_host(host, 60_000, 100, 100));

    rig.controller.tick();
    let mode = rig.controller.mode();
    let deadline = rig.controller.transition_deadline();
    assert_eq!(mode, Mode::NeutralToShadowTimer);

    // A second bootstrap against the same application directory resumes
    let config = sunshade::config::load_from_str(&toml).unwrap();
    let restored =
        match Controller::bootstrap(config, rig.host.clone(), rig.clock.clone()).unwrap() {
            Startup::Ready(controller) => controller,
            Startup::NeedsOperatorSetup { .. } => panic!("entities exist"),
        };
    assert_eq!(restored.mode(), mode);
    assert_eq!(restored.transition_deadline(), deadline);
}

#[test]
fn stale_snapshot_starts_in_neutral() {
    let toml = blinds_toml("save_states = true", "");
    let mut rig = rig(&toml, |host| populate_blinds_host(host, 60_000, 100, 100));
    rig.controller.tick();
    assert_eq!(rig.controller.mode(), Mode::NeutralToShadowTimer);

    rig.clock.advance_secs(61 * 60);
    let config = sunshade::config::load_from_str(&toml).unwrap();
    let restored =
        match Controller::bootstrap(config, rig.host.clone(), rig.clock.clone()).unwrap() {
            Startup::Ready(controller) => controller,
            Startup::NeedsOperatorSetup { .. } => panic!("entities exist"),
        };
    assert_eq!(restored.mode(), Mode::Neutral);
}

#[test]
fn missing_managed_entities_yield_operator_setup() {
    Log::set_enabled(false);
    let app_dir = TempDir::new().unwrap();
    // Sensors exist, managed booleans do not
    let host = FakeHost::new(app_dir.path().to_path_buf());
    host.put_state("sensor.south_lux", StateValue::Number(60_000.0));
    host.put_attribute("cover.south", "current_position", StateValue::Number(100.0));

    let config = sunshade::config::load_from_str(&blinds_toml("", "")).unwrap();
    let clock = ManualTimeSource::new(start_time());
    match Controller::bootstrap(config, host, clock).unwrap() {
        Startup::Ready(_) => panic!("bootstrap must not complete without managed entities"),
        Startup::NeedsOperatorSetup { template, path } => {
            assert!(template.contains("south_blinds_locked:"));
            assert!(template.contains("south_manipulation_active:"));
            let written = std::fs::read_to_string(&path).unwrap();
            assert!(written.starts_with("input_boolean:\n"));
            assert!(written.contains("south_blinds_locked_external:"));
        }
    }
}

#[test]
fn shutter_first_command_then_waits_for_acknowledgement() {
    Log::set_enabled(false);
    let app_dir = TempDir::new().unwrap();
    let host = FakeHost::new(app_dir.path().to_path_buf());
    host.put_attribute("cover.kitchen", "current_position", StateValue::Number(100.0));
    host.put_state("sensor.west_lux", StateValue::Number(60_000.0));
    host.put_attribute("sun.sun", "azimuth", StateValue::Number(180.0));
    host.put_attribute("sun.sun", "elevation", StateValue::Number(40.0));
    host.put_attribute(
        "sun.sun",
        "next_dusk",
        StateValue::Text((start_time() + Duration::hours(9)).to_rfc3339()),
    );
    host.register_boolean("input_boolean.kitchen_shutter_locked");
    host.register_boolean("input_boolean.kitchen_shutter_locked_external");
    host.register_boolean("input_boolean.kitchen_manipulation_active");

    let clock = ManualTimeSource::new(start_time());
    let config = sunshade::config::load_from_str(&shutter_toml()).unwrap();
    let mut controller =
        match Controller::bootstrap(config, host.clone(), clock.clone()).unwrap() {
            Startup::Ready(controller) => controller,
            Startup::NeedsOperatorSetup { .. } => panic!("entities exist"),
        };

    controller.tick();
    clock.advance_secs(166);
    controller.tick();
    assert_eq!(controller.mode(), Mode::Shadow);
    // First command ever goes straight out:
    // 500 mm strip over 2000 mm travel at 40° elevation keeps 80% open
    assert_eq!(host.position_calls(), vec![80]);

    // Until telemetry acknowledges it, the shutter refuses to re-command
    clock.advance_secs(30);
    controller.tick();
    assert_eq!(host.position_calls(), vec![80]);

    // The cover settles at the commanded height; subsequent ticks are
    // suppressed by tolerance
    controller.on_cover_change(
        StateValue::Text("open".into()),
        StateValue::Number(80.0),
        StateValue::Missing,
    );
    clock.advance_secs(30);
    controller.tick();
    assert_eq!(host.position_calls(), vec![80]);
}
