use super::*;
use crate::config::loading::load_from_str;

fn minimal_blinds_toml() -> String {
    r#"
unique_id = "south_office"
kind = "blinds"

[entities]
cover = "cover.south_office"
brightness_shadow = "sensor.south_lux"

[facade]
facade_angle = 180
"#
    .to_string()
}

fn minimal_shutter_toml() -> String {
    r#"
unique_id = "kitchen"
kind = "shutter"

[entities]
cover = "cover.kitchen"
brightness_shadow = "sensor.west_lux"

[facade]
facade_angle = 270
"#
    .to_string()
}

#[test]
fn minimal_blinds_config_loads_with_defaults() {
    let config = load_from_str(&minimal_blinds_toml()).unwrap();

    assert_eq!(config.kind, DeviceKind::Blinds);
    assert!(config.kind.has_tilt());
    assert_eq!(config.facade.facade_offset_entry, -90);
    assert_eq!(config.facade.facade_offset_exit, 90);
    assert_eq!(config.move_constraints.height_step, 5);
    assert_eq!(config.move_constraints.angle_tolerance, 5);
    assert_eq!(config.neutral.neutral_height, 100);
    assert_eq!(config.shadow.shadow_brightness_threshold, 50_000);
    assert_eq!(config.dawn.dawn_brightness_threshold, 10);
    assert_eq!(config.delays.neutral_to_shadow_delay, 165);
    assert_eq!(config.delays.dawn_horizontal_to_neutral_delay, 915);
    assert_eq!(config.external_lock_minutes, 30);
    assert!(config.shadow_active);
    assert!(config.dawn_active);
    assert!(!config.ventilation_active);
    assert!(!config.save_states);

    let slats = config.slats();
    assert_eq!(slats.slat_width, 90.0);
    assert_eq!(slats.slat_distance, 80.0);
    assert!(!slats.use_light_strip);
}

#[test]
fn minimal_shutter_config_loads_with_defaults() {
    let config = load_from_str(&minimal_shutter_toml()).unwrap();

    assert_eq!(config.kind, DeviceKind::Shutter);
    assert!(!config.kind.has_tilt());
    assert_eq!(config.kind.change_counter_ceiling(), 5);
    assert_eq!(config.shadow.light_strip, Some(500.0));
    assert_eq!(config.shadow.total_height, Some(2000.0));
    assert_eq!(config.delays.shadow_to_neutral_delay, 615);
    assert_eq!(config.delays.dawn_to_neutral_delay, 915);
}

#[test]
fn blinds_counter_ceiling_is_two() {
    let config = load_from_str(&minimal_blinds_toml()).unwrap();
    assert_eq!(config.kind.change_counter_ceiling(), 2);
}

#[test]
fn unique_id_with_whitespace_is_rejected() {
    let toml = minimal_blinds_toml().replace("south_office", "south office");
    let err = load_from_str(&toml).unwrap_err();
    assert!(format!("{err:#}").contains("whitespace"));
}

#[test]
fn entry_offset_must_be_below_exit_offset() {
    let mut toml = minimal_blinds_toml();
    toml.push_str("facade_offset_entry = 90\nfacade_offset_exit = -90\n");
    let err = load_from_str(&toml).unwrap_err();
    assert!(format!("{err:#}").contains("facade_offset_entry"));
}

#[test]
fn min_elevation_must_be_below_max_elevation() {
    let mut toml = minimal_blinds_toml();
    toml.push_str("min_elevation = 45\nmax_elevation = 45\n");
    let err = load_from_str(&toml).unwrap_err();
    assert!(format!("{err:#}").contains("min_elevation"));
}

#[test]
fn inverted_move_constraints_are_rejected() {
    let mut toml = minimal_blinds_toml();
    toml.push_str("\n[move_constraints]\nmin_angle = 80\nmax_angle = 20\n");
    let err = load_from_str(&toml).unwrap_err();
    assert!(format!("{err:#}").contains("min_angle"));
}

#[test]
fn ventilation_requires_window_sensor() {
    let toml = minimal_blinds_toml().replace(
        "kind = \"blinds\"",
        "kind = \"blinds\"\nventilation_active = true",
    );
    let err = load_from_str(&toml).unwrap_err();
    assert!(format!("{err:#}").contains("window_sensor"));
}

#[test]
fn solar_heating_requires_climate_and_section() {
    let toml = minimal_blinds_toml().replace(
        "kind = \"blinds\"",
        "kind = \"blinds\"\nsolar_heating_available = true",
    );
    let err = load_from_str(&toml).unwrap_err();
    assert!(format!("{err:#}").contains("climate"));

    let toml = minimal_blinds_toml().replace(
        "[entities]",
        "solar_heating_available = true\n\n[entities]\nclimate = \"climate.office\"",
    );
    let err = load_from_str(&toml).unwrap_err();
    assert!(format!("{err:#}").contains("solar_heating"));
}

#[test]
fn solar_heating_section_parses() {
    let toml = minimal_blinds_toml().replace(
        "[entities]",
        "solar_heating_available = true\n\n[solar_heating]\n\
         solar_heating_temperature = 21.5\n\
         solar_heating_hysteresis = 0.5\n\
         solar_heating_height = 100\n\n[entities]\nclimate = \"climate.office\"",
    );
    let config = load_from_str(&toml).unwrap();
    let solar = config.solar_heating.unwrap();
    assert_eq!(solar.solar_heating_temperature, 21.5);
    assert_eq!(solar.solar_heating_angle, 100); // defaulted
}

#[test]
fn blinds_section_on_shutter_is_rejected() {
    let mut toml = minimal_shutter_toml();
    toml.push_str("\n[blinds]\nslat_width = 90\n");
    let err = load_from_str(&toml).unwrap_err();
    assert!(format!("{err:#}").contains("shutter"));
}

#[test]
fn light_strip_flag_requires_measurements() {
    let mut toml = minimal_blinds_toml();
    toml.push_str("\n[blinds]\nuse_light_strip = true\n\n[shadow]\nlight_strip = 500\n");
    // total_height deliberately removed
    let toml = toml.replace("light_strip = 500", "light_strip = 500\ntotal_height = 0");
    let err = load_from_str(&toml).unwrap_err();
    assert!(format!("{err:#}").contains("total_height"));
}

#[test]
fn unknown_keys_are_rejected() {
    let mut toml = minimal_blinds_toml();
    toml.push_str("\n[shadow]\nshadow_heigth = 10\n");
    assert!(load_from_str(&toml).is_err());
}

#[test]
fn threshold_entity_is_optional() {
    let mut toml = minimal_blinds_toml();
    toml.push_str(
        "\n[shadow]\nshadow_brightness_threshold_entity = \"input_number.sunshine_threshold\"\n",
    );
    let config = load_from_str(&toml).unwrap();
    assert_eq!(
        config.shadow.shadow_brightness_threshold_entity.as_deref(),
        Some("input_number.sunshine_threshold")
    );
}
