//! Shared test support: an in-memory host the controller can drive.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use sunshade::host::{HostAdapter, StateValue};

/// Recorded service invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCall {
    pub service: String,
    pub entity_id: String,
    pub data: serde_json::Value,
}

/// In-memory host: entity states, attributes, and a service-call recorder.
pub struct FakeHost {
    states: Mutex<HashMap<String, StateValue>>,
    attributes: Mutex<HashMap<(String, String), StateValue>>,
    calls: Mutex<Vec<ServiceCall>>,
    service_success: Mutex<bool>,
    app_dir: PathBuf,
}

impl FakeHost {
    pub fn new(app_dir: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            states: Mutex::new(HashMap::new()),
            attributes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            service_success: Mutex::new(true),
            app_dir,
        })
    }

    pub fn put_state(&self, entity: &str, value: StateValue) {
        self.states.lock().unwrap().insert(entity.to_string(), value);
    }

    pub fn put_attribute(&self, entity: &str, attribute: &str, value: StateValue) {
        self.attributes
            .lock()
            .unwrap()
            .insert((entity.to_string(), attribute.to_string()), value);
    }

    /// Register a managed boolean in the off state.
    pub fn register_boolean(&self, entity: &str) {
        self.put_state(entity, StateValue::Text("off".to_string()));
    }

    pub fn state_text(&self, entity: &str) -> Option<String> {
        match self.states.lock().unwrap().get(entity) {
            Some(StateValue::Text(text)) => Some(text.clone()),
            _ => None,
        }
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn position_calls(&self) -> Vec<i64> {
        self.calls()
            .iter()
            .filter(|call| call.service == "cover/set_cover_position")
            .filter_map(|call| call.data.get("position").and_then(|v| v.as_i64()))
            .collect()
    }

    pub fn tilt_calls(&self) -> Vec<i64> {
        self.calls()
            .iter()
            .filter(|call| call.service == "cover/set_cover_tilt_position")
            .filter_map(|call| call.data.get("tilt_position").and_then(|v| v.as_i64()))
            .collect()
    }
}

impl HostAdapter for FakeHost {
    fn get_state(&self, entity: &str) -> StateValue {
        self.states
            .lock()
            .unwrap()
            .get(entity)
            .cloned()
            .unwrap_or(StateValue::Missing)
    }

    fn get_attribute(&self, entity: &str, attribute: &str) -> StateValue {
        self.attributes
            .lock()
            .unwrap()
            .get(&(entity.to_string(), attribute.to_string()))
            .cloned()
            .unwrap_or(StateValue::Missing)
    }

    fn set_state(&self, entity: &str, value: &str) -> anyhow::Result<()> {
        self.put_state(entity, StateValue::from_text(value));
        Ok(())
    }

    fn call_service(
        &self,
        service: &str,
        entity_id: &str,
        data: serde_json::Value,
    ) -> anyhow::Result<bool> {
        self.calls.lock().unwrap().push(ServiceCall {
            service: service.to_string(),
            entity_id: entity_id.to_string(),
            data,
        });
        Ok(*self.service_success.lock().unwrap())
    }

    fn entity_exists(&self, entity: &str) -> bool {
        let entity_key = entity.to_string();
        self.states.lock().unwrap().contains_key(&entity_key)
            || self
                .attributes
                .lock()
                .unwrap()
                .keys()
                .any(|(candidate, _)| candidate == &entity_key)
    }

    fn app_dir(&self) -> PathBuf {
        self.app_dir.clone()
    }
}
