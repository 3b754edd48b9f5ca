//! The per-device controller: one owning aggregate per physical cover.
//!
//! The controller composes the state machine, geometry solver, constraint
//! rules, actuator and override detector, caches every sensor reading it
//! subscribes to, and exposes handler methods for the host to wire into its
//! event bus. All handlers run on one logical execution context; handlers
//! that materially change inputs re-run the control tick synchronously
//! instead of waiting for the next 30 s boundary.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::actuator::{Actuator, Position};
use crate::common::constants::{SENSOR_RETRY_DELAY_SECS, STATE_OFF, STATE_ON};
use crate::common::utils::next_tick_boundary;
use crate::config::Config;
use crate::constraints::{self, SolarHeating, WindowState};
use crate::geometry;
use crate::host::entities::{EntityCheck, ManagedEntities, check_managed_entities};
use crate::host::{HostAdapter, StateValue};
use crate::logger::Log;
use crate::override_detector::{self, CoverTelemetry, LockState};
use crate::snapshot;
use crate::state_machine::{Conditions, Mode, StateMachine, mode_target};
use crate::time_source::TimeSource;

/// Cached sensor readings. `None` means "never seen a usable value";
/// unknown/unavailable updates never overwrite a cached reading.
#[derive(Debug, Default)]
struct SensorCache {
    azimuth: Option<f64>,
    elevation: Option<f64>,
    next_dusk: Option<DateTime<Local>>,
    brightness_shadow: Option<i64>,
    brightness_dawn: Option<i64>,
    window: Option<WindowState>,
    temperature: Option<f64>,
    /// Live value of the threshold entity, when one is configured.
    shadow_threshold_override: Option<i64>,
}

/// Bootstrap outcome.
pub enum Startup {
    /// The controller is ready to be wired into the host.
    Ready(Box<Controller>),
    /// Managed entities are missing. The template block has been written to
    /// the application directory; the operator must install it into the
    /// host configuration and restart.
    NeedsOperatorSetup { template: String, path: PathBuf },
}

/// One controller per physical shading device.
pub struct Controller {
    config: Config,
    host: Arc<dyn HostAdapter>,
    clock: Arc<dyn TimeSource>,
    entities: ManagedEntities,
    machine: StateMachine,
    actuator: Actuator,
    locks: LockState,
    solar: SolarHeating,
    sensors: SensorCache,
    current: Position,
    in_tick: bool,
}

impl Controller {
    /// Validate the configuration, verify the managed entities, restore the
    /// last snapshot and read every configured sensor once (with a single
    /// delayed retry for integrations that come up slowly after a host
    /// restart).
    pub fn bootstrap(
        config: Config,
        host: Arc<dyn HostAdapter>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Startup> {
        crate::config::validate_config(&config)?;
        Log::set_debug(config.debug);
        config.log_config();

        let entities = ManagedEntities::new(
            &config.unique_id,
            config.kind,
            config.solar_heating_available,
        );

        if let EntityCheck::Missing(template) =
            check_managed_entities(host.as_ref(), &entities, config.display_name(), config.kind)
        {
            let path = template.write_to(&host.app_dir())?;
            log_pipe!();
            log_warning!("Managed entities are missing in the host.");
            log_indented!("Copy the block in {} into the host configuration", path.display());
            log_indented!("and reload it, then start this controller again.");
            return Ok(Startup::NeedsOperatorSetup {
                template: template.render(),
                path,
            });
        }

        let now = clock.now();
        let machine = if config.save_states {
            match snapshot::load(&host.app_dir(), &config.unique_id, now) {
                Some((mode, timer)) => {
                    log_decorated!("Restored mode {:?} from snapshot", mode);
                    StateMachine::restored(mode, timer)
                }
                None => StateMachine::new(),
            }
        } else {
            StateMachine::new()
        };

        let current = Position {
            height: host
                .get_attribute(&config.entities.cover, "current_position")
                .as_int(),
            tilt: config.kind.has_tilt().then(|| {
                host.get_attribute(&config.entities.cover, "current_tilt_position")
                    .as_int()
            })
            .flatten(),
        };
        log_debug!("Initial cover position: {:?}", current);

        let mut controller = Controller {
            actuator: Actuator::new(current),
            entities,
            machine,
            locks: LockState::default(),
            solar: SolarHeating::new(),
            sensors: SensorCache::default(),
            current,
            in_tick: false,
            config,
            host,
            clock,
        };

        // Sensors may not be ready right after a host restart (bus-backed
        // integrations have to be read once first); retry a single time
        if let Err(err) = controller.read_sensor_values() {
            log_pipe!();
            log_warning!("Initial sensor read failed ({err:#}), retrying once");
            controller
                .clock
                .sleep(StdDuration::from_secs(SENSOR_RETRY_DELAY_SECS));
            controller.read_sensor_values()?;
        }
        controller.read_sun_state();
        controller.read_lock_entities()?;

        controller.save_snapshot();
        log_decorated!("Controller '{}' initialized", controller.config.display_name());
        Ok(Startup::Ready(Box::new(controller)))
    }

    /// The control tick. Runs every 30 s from the host scheduler and
    /// synchronously from handlers that change policy inputs; overlapping
    /// invocations are dropped.
    pub fn tick(&mut self) {
        if self.in_tick {
            log_debug!("Dropping overlapping tick");
            return;
        }
        self.in_tick = true;
        self.run_control();
        self.in_tick = false;
    }

    fn run_control(&mut self) {
        let now = self.clock.now();

        override_detector::reconcile_external_lock(
            self.host.as_ref(),
            &self.entities.locked_external,
            &mut self.locks,
            now,
        );

        if self.locks.manual {
            log_debug!("Cover is locked");
        } else if self.locks.external {
            log_debug!(
                "Cover is locked due to external change until {:?}",
                self.locks.external_deadline
            );
        } else if self.locks.manipulation {
            log_debug!("Cover is locked due to manipulation");
        }

        let conditions = self.conditions();
        let mode = self
            .machine
            .step(&conditions, &self.config.delays, self.config.kind, now);
        log_debug!("Mode after evaluation: {:?}", mode);

        let mut target = mode_target(
            mode,
            &self.config,
            self.sensors.azimuth.unwrap_or_default(),
            self.sensors.elevation.unwrap_or_default(),
        );
        constraints::normalize(&mut target, &self.config.move_constraints);

        if self.config.ventilation_active {
            constraints::apply_ventilation(
                self.config.kind,
                self.sensors.window,
                &self.config.ventilation,
                self.current.height,
                &mut target,
            );
        }

        if self.config.solar_heating_available
            && let Some(solar_config) = &self.config.solar_heating
        {
            let (drive, status_change) = self.solar.evaluate(
                self.locks.solar_heating_enabled,
                self.sensors.temperature,
                solar_config,
            );
            if let Some((height, angle)) = drive {
                target.height = height;
                if target.tilt.is_some() {
                    target.tilt = Some(angle);
                }
            }
            if let Some(on) = status_change {
                self.publish_solar_status(on);
            }
        }

        // Configured override values onto the step grid too
        constraints::normalize(&mut target, &self.config.move_constraints);

        constraints::apply_dusk_up_lock(
            self.config.dawn.dawn_prevent_move_up_after_dusk,
            self.sensors.next_dusk,
            now,
            self.current.height,
            &mut target,
        );
        constraints::apply_lockout_protection(
            self.config.lockout_protection_active,
            self.sensors.window,
            self.current.height,
            &mut target,
        );
        constraints::apply_fully_open_coupling(&mut target, &self.config.move_constraints);

        log_debug!("Resolved target: {:?}", target);
        self.actuator.set_position(
            self.host.as_ref(),
            &self.config.entities.cover,
            self.config.kind,
            &self.config.move_constraints,
            &self.locks,
            self.current,
            &target,
        );

        self.save_snapshot();
    }

    /// Assemble the transition inputs from the sensor cache.
    fn conditions(&self) -> Conditions {
        let in_sun = match (self.sensors.azimuth, self.sensors.elevation) {
            (Some(azimuth), Some(elevation)) => {
                geometry::in_sun(azimuth, elevation, &self.config.facade)
            }
            _ => false,
        };
        Conditions {
            in_sun,
            shadow_active: self.config.shadow_active,
            dawn_active: self.config.dawn_active,
            brightness_shadow: self.sensors.brightness_shadow,
            brightness_dawn: self.dawn_brightness(),
            shadow_threshold: self.shadow_threshold(),
            dawn_threshold: self.config.dawn.dawn_brightness_threshold,
        }
    }

    /// Dawn brightness falls back to the shadow sensor when no separate dawn
    /// sensor is configured.
    fn dawn_brightness(&self) -> Option<i64> {
        if self.config.entities.brightness_dawn.is_some() {
            self.sensors.brightness_dawn
        } else {
            self.sensors.brightness_shadow
        }
    }

    /// The live threshold entity overrides the static configuration value.
    fn shadow_threshold(&self) -> i64 {
        if self.config.shadow.shadow_brightness_threshold_entity.is_some() {
            self.sensors
                .shadow_threshold_override
                .unwrap_or(self.config.shadow.shadow_brightness_threshold)
        } else {
            self.config.shadow.shadow_brightness_threshold
        }
    }

    // # Event handlers

    /// Sun entity changed: cache azimuth, elevation and the day's dusk.
    pub fn on_sun_change(
        &mut self,
        azimuth: StateValue,
        elevation: StateValue,
        next_dusk: StateValue,
    ) {
        if let Some(azimuth) = azimuth.as_f64() {
            self.sensors.azimuth = Some(azimuth);
        }
        if let Some(elevation) = elevation.as_f64() {
            self.sensors.elevation = Some(elevation);
        }
        if let Some(raw) = next_dusk.as_text()
            && let Ok(parsed) = DateTime::parse_from_rfc3339(raw)
        {
            self.sensors.next_dusk = Some(parsed.with_timezone(&Local));
        }

        if let (Some(azimuth), Some(elevation)) = (self.sensors.azimuth, self.sensors.elevation) {
            if geometry::in_sun(azimuth, elevation, &self.config.facade) {
                log_debug!("Facade is in sun");
            } else {
                log_debug!("Facade is NOT in sun");
            }
        }
    }

    /// Shadow brightness sensor changed.
    pub fn on_brightness_shadow_change(&mut self, value: StateValue) {
        if let Some(brightness) = value.as_int() {
            self.sensors.brightness_shadow = Some(brightness);
        }
    }

    /// Dawn brightness sensor changed.
    pub fn on_brightness_dawn_change(&mut self, value: StateValue) {
        if let Some(brightness) = value.as_int() {
            self.sensors.brightness_dawn = Some(brightness);
        }
    }

    /// Dynamic shadow-threshold sensor changed.
    pub fn on_shadow_threshold_change(&mut self, value: StateValue) {
        if let Some(threshold) = value.as_int() {
            log_debug!("Updating shadow brightness threshold to {threshold}");
            self.sensors.shadow_threshold_override = Some(threshold);
        }
    }

    /// Window contact changed. Re-runs the control immediately so
    /// ventilation and lockout protection take effect without waiting for
    /// the next tick. Unknown/unavailable updates keep the stale reading;
    /// only the initial read can observe an unavailable sensor.
    pub fn on_window_change(&mut self, value: StateValue) {
        let state = match value.as_on_off() {
            Some(true) => WindowState::Open,
            Some(false) => WindowState::Closed,
            None => return,
        };
        self.sensors.window = Some(state);
        self.tick();
    }

    /// Indoor temperature changed.
    pub fn on_temperature_change(&mut self, value: StateValue) {
        if let Some(temperature) = value.as_f64() {
            self.sensors.temperature = Some(temperature);
        }
    }

    /// One of the managed booleans changed. Re-runs the control immediately.
    pub fn on_lock_entity_change(&mut self, entity: &str, value: StateValue) {
        let Some(on) = value.as_on_off() else {
            return;
        };
        log_debug!("Managed boolean {entity} changed: {on}");

        if entity == self.entities.locked {
            self.locks.manual = on;
        } else if entity == self.entities.locked_external {
            self.locks.external = on;
            if on {
                if self.locks.external_deadline.is_none() {
                    self.locks.external_deadline = Some(
                        self.clock.now()
                            + chrono::Duration::minutes(self.config.external_lock_minutes),
                    );
                }
            } else {
                self.locks.external_deadline = None;
            }
        } else if entity == self.entities.manipulation_active {
            self.locks.manipulation = on;
        } else if Some(entity) == self.entities.solar_heating_active.as_deref() {
            self.locks.solar_heating_enabled = on;
        } else {
            return;
        }
        self.tick();
    }

    /// Cover telemetry arrived; hand it to the override detector.
    pub fn on_cover_change(&mut self, state: StateValue, position: StateValue, tilt: StateValue) {
        let telemetry = match state.as_text() {
            Some("opening") | Some("closing") => CoverTelemetry::Moving,
            Some(_) => CoverTelemetry::Settled {
                height: position.as_int(),
                tilt: tilt.as_int(),
            },
            // Unknown/unavailable/missing: not usable for correlation
            None => CoverTelemetry::Moving,
        };

        override_detector::handle_telemetry(
            self.host.as_ref(),
            &self.entities.locked_external,
            &self.config.move_constraints,
            self.config.kind.change_counter_ceiling(),
            self.config.external_lock_minutes,
            &mut self.locks,
            &mut self.actuator,
            &mut self.current,
            telemetry,
            self.clock.now(),
        );
    }

    /// Write-through for service calls targeting the managed booleans.
    ///
    /// The solar-heating status mirror is read-only: external writes are
    /// overwritten with the controller's internal value.
    pub fn on_service_call(&mut self, domain: &str, service: &str, entity_ids: &[String]) {
        if domain != "input_boolean" || !matches!(service, "turn_on" | "turn_off") {
            return;
        }
        let value = if service == "turn_on" { STATE_ON } else { STATE_OFF };

        for entity_id in entity_ids {
            if !self.entities.all().contains(&entity_id.as_str()) {
                continue;
            }
            if Some(entity_id.as_str()) == self.entities.solar_heating_status.as_deref() {
                let status = self.solar.status_on();
                self.publish_solar_status(status);
            } else {
                log_decorated!("{entity_id} switched {value}");
                if let Err(err) = self.host.set_state(entity_id, value) {
                    log_error!("Could not mirror {entity_id}: {err:#}");
                }
            }
        }
    }

    /// When the next scheduled tick should run.
    pub fn next_tick_time(&self) -> DateTime<Local> {
        next_tick_boundary(self.clock.now())
    }

    // # Accessors (observability and tests)

    pub fn mode(&self) -> Mode {
        self.machine.mode()
    }

    pub fn transition_deadline(&self) -> Option<DateTime<Local>> {
        self.machine.deadline()
    }

    pub fn locks(&self) -> &LockState {
        &self.locks
    }

    pub fn current_position(&self) -> Position {
        self.current
    }

    pub fn expected_position(&self) -> Position {
        Position {
            height: self.actuator.expected_height,
            tilt: self.actuator.expected_tilt,
        }
    }

    // # Internals

    fn read_sensor_values(&mut self) -> Result<()> {
        let value = self.host.get_state(&self.config.entities.brightness_shadow);
        self.sensors.brightness_shadow = Some(value.as_int().with_context(|| {
            format!(
                "brightness sensor {} not readable",
                self.config.entities.brightness_shadow
            )
        })?);

        if let Some(entity) = &self.config.entities.brightness_dawn {
            let value = self.host.get_state(entity);
            self.sensors.brightness_dawn = Some(
                value
                    .as_int()
                    .with_context(|| format!("dawn brightness sensor {entity} not readable"))?,
            );
        }

        if let Some(entity) = &self.config.shadow.shadow_brightness_threshold_entity {
            let value = self.host.get_state(entity);
            self.sensors.shadow_threshold_override = Some(
                value
                    .as_int()
                    .with_context(|| format!("threshold sensor {entity} not readable"))?,
            );
        }

        if let Some(entity) = &self.config.entities.window_sensor {
            self.sensors.window = match self.host.get_state(entity) {
                StateValue::Unavailable => Some(WindowState::Unavailable),
                value => match value.as_on_off() {
                    Some(true) => Some(WindowState::Open),
                    Some(false) => Some(WindowState::Closed),
                    None => None,
                },
            };
        }

        if self.config.solar_heating_available
            && let Some(entity) = &self.config.entities.climate
        {
            self.sensors.temperature = self
                .host
                .get_attribute(entity, "current_temperature")
                .as_f64();
        }

        Ok(())
    }

    fn read_sun_state(&mut self) {
        let sun = &self.config.entities.sun;
        let azimuth = self.host.get_attribute(sun, "azimuth");
        let elevation = self.host.get_attribute(sun, "elevation");
        let next_dusk = self.host.get_attribute(sun, "next_dusk");
        self.on_sun_change(azimuth, elevation, next_dusk);
    }

    fn read_lock_entities(&mut self) -> Result<()> {
        self.locks.manual = self.host.get_state(&self.entities.locked).as_on_off() == Some(true);
        self.locks.manipulation = self
            .host
            .get_state(&self.entities.manipulation_active)
            .as_on_off()
            == Some(true);

        // A leftover external lock from the previous run is meaningless
        // without its deadline; reset it
        let external = self
            .host
            .get_state(&self.entities.locked_external)
            .as_on_off()
            == Some(true);
        if external {
            self.host
                .set_state(&self.entities.locked_external, STATE_OFF)
                .context("resetting external lock entity")?;
        }
        self.locks.external = false;
        self.locks.external_deadline = None;

        if let Some(entity) = &self.entities.solar_heating_active {
            self.locks.solar_heating_enabled =
                self.host.get_state(entity).as_on_off() == Some(true);
        }
        Ok(())
    }

    fn publish_solar_status(&self, on: bool) {
        if let Some(entity) = &self.entities.solar_heating_status {
            let value = if on { STATE_ON } else { STATE_OFF };
            log_debug!("Solar heating status {value}");
            if let Err(err) = self.host.set_state(entity, value) {
                log_error!("Could not publish solar heating status: {err:#}");
            }
        }
    }

    fn save_snapshot(&self) {
        if !self.config.save_states {
            return;
        }
        if let Err(err) = snapshot::save(
            &self.host.app_dir(),
            &self.config.unique_id,
            self.machine.mode(),
            self.machine.deadline(),
            self.clock.now(),
        ) {
            log_error!("Failed to save state snapshot: {err:#}");
        }
    }
}
