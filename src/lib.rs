//! # Sunshade
//!
//! Automated facade shading control for venetian blinds and roller shutters.
//!
//! Sunshade drives a single exterior shading device from solar geometry,
//! ambient-light measurements, indoor climate and window state. The hard core
//! is a hysteretic, time-delayed state machine that debounces noisy brightness
//! sensors, a slat-tilt geometry solver for the blinds variant, and a
//! manual-override detector that correlates expected positions against
//! observed cover telemetry.
//!
//! ## Architecture
//!
//! - **config**: Configuration loading, validation, and defaults
//! - **controller**: The owning aggregate: bootstrap, tick, event handlers
//! - **state_machine**: Sun/brightness driven mode transitions with timers
//! - **geometry**: Sun-on-facade test, slat tilt and light-strip math
//! - **constraints**: Ventilation, solar heating, dusk up-lock, lockout
//! - **actuator**: Tolerance-suppressed position/tilt commands
//! - **override_detector**: Automated-vs-manual telemetry correlation
//! - **host**: The home-automation host contract and managed entities
//! - **logger**: Structured logging with visual formatting
//!
//! The crate is host-agnostic: the embedding implements [`host::HostAdapter`]
//! and wires its event bus and scheduler to the controller's handler methods.

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod actuator;
pub mod common;
pub mod config;
pub mod constraints;
pub mod controller;
pub mod geometry;
pub mod host;
pub mod override_detector;
pub mod snapshot;
pub mod state_machine;
pub mod time_source;

// Re-export important types for easier access
pub use config::{Config, DeviceKind};
pub use controller::{Controller, Startup};
pub use host::{HostAdapter, StateValue};
pub use logger::Log;
pub use state_machine::Mode;
