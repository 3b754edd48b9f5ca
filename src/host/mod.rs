//! Home-automation host contract.
//!
//! The host provides entity state, service calls and a writable application
//! directory. Everything else (event subscriptions, the 30 s tick scheduler,
//! the event bus itself) stays on the embedding's side of the trait: the host
//! wires its callbacks to the controller's handler methods.

pub mod entities;

use std::path::PathBuf;

pub use crate::common::constants::{STATE_OFF, STATE_ON};
use crate::common::constants::{STATE_UNAVAILABLE, STATE_UNKNOWN};

/// A value read from the host's state machine.
///
/// Hosts report missing integrations as the literal strings `"unknown"` and
/// `"unavailable"`; both are modelled explicitly so callers treat them as
/// "no update" instead of numeric zero.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    /// The entity or attribute does not exist.
    Missing,
    Unknown,
    Unavailable,
    Number(f64),
    Text(String),
}

impl StateValue {
    /// Build a value from a raw textual host state, mapping the reserved
    /// marker strings to their variants.
    pub fn from_text(raw: &str) -> Self {
        match raw {
            STATE_UNKNOWN => StateValue::Unknown,
            STATE_UNAVAILABLE => StateValue::Unavailable,
            other => StateValue::Text(other.to_string()),
        }
    }

    /// True for actual values, false for the missing/unknown/unavailable markers.
    pub fn is_fresh(&self) -> bool {
        matches!(self, StateValue::Number(_) | StateValue::Text(_))
    }

    /// Numeric reading as an integer, truncated like the sensor pipeline
    /// expects (a lux sensor reporting "55.9" reads as 55).
    pub fn as_int(&self) -> Option<i64> {
        self.as_f64().map(|v| v.trunc() as i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StateValue::Number(n) => Some(*n),
            StateValue::Text(t) => t.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StateValue::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Interpret an on/off binary state. Anything else reads as `None`.
    pub fn as_on_off(&self) -> Option<bool> {
        match self.as_text() {
            Some(STATE_ON) => Some(true),
            Some(STATE_OFF) => Some(false),
            _ => None,
        }
    }
}

/// Capabilities consumed from the home-automation host.
///
/// Implementations are expected to be cheap to call from the single-threaded
/// control context; none of the methods may re-enter the controller.
#[cfg_attr(test, mockall::automock)]
pub trait HostAdapter: Send + Sync {
    /// Read an entity's state.
    fn get_state(&self, entity: &str) -> StateValue;

    /// Read a single attribute of an entity.
    fn get_attribute(&self, entity: &str, attribute: &str) -> StateValue;

    /// Write an entity's state.
    fn set_state(&self, entity: &str, value: &str) -> anyhow::Result<()>;

    /// Invoke a host service. Returns the host's success flag.
    fn call_service(
        &self,
        service: &str,
        entity_id: &str,
        data: serde_json::Value,
    ) -> anyhow::Result<bool>;

    /// Whether the entity is registered with the host at all.
    fn entity_exists(&self, entity: &str) -> bool;

    /// Writable application directory for snapshots and the entity template.
    fn app_dir(&self) -> PathBuf;
}
