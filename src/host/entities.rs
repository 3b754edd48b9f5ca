//! Managed boolean entities and the operator-facing entity template.
//!
//! Each controller owns a small set of `input_boolean` entities in the host:
//! the manual lock, the externally-detected lock, the manipulation hold, and
//! (when solar heating is configured) the heating enable switch plus its
//! read-only status mirror. The host cannot create these on its own: when any
//! are missing at bootstrap, the controller renders a configuration block the
//! operator pastes into the host configuration, and refuses to run until the
//! entities exist.
//!
//! The template collector is an explicit per-bootstrap value, not a process
//! singleton. Several controllers sharing one application directory append to
//! the same template file; an advisory file lock serialises the appends and
//! each controller writes only its own block.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::common::constants::ENTITY_TEMPLATE_FILENAME;
use crate::config::DeviceKind;
use crate::host::HostAdapter;

/// Entity ids of the managed booleans for one controller.
#[derive(Debug, Clone)]
pub struct ManagedEntities {
    pub locked: String,
    pub locked_external: String,
    pub manipulation_active: String,
    pub solar_heating_active: Option<String>,
    pub solar_heating_status: Option<String>,
}

impl ManagedEntities {
    pub fn new(unique_id: &str, kind: DeviceKind, solar_heating: bool) -> Self {
        let kind = kind.token();
        let boolean = |suffix: &str| format!("input_boolean.{unique_id}_{suffix}");
        Self {
            locked: boolean(&format!("{kind}_locked")),
            locked_external: boolean(&format!("{kind}_locked_external")),
            manipulation_active: boolean("manipulation_active"),
            solar_heating_active: solar_heating.then(|| boolean("solar_heating_active")),
            solar_heating_status: solar_heating.then(|| boolean("solar_heating_status")),
        }
    }

    /// All entity ids this controller manages.
    pub fn all(&self) -> Vec<&str> {
        let mut ids = vec![
            self.locked.as_str(),
            self.locked_external.as_str(),
            self.manipulation_active.as_str(),
        ];
        if let Some(active) = &self.solar_heating_active {
            ids.push(active.as_str());
        }
        if let Some(status) = &self.solar_heating_status {
            ids.push(status.as_str());
        }
        ids
    }

    /// Strip the `input_boolean.` domain prefix from one of our ids.
    fn object_id(entity_id: &str) -> &str {
        entity_id
            .strip_prefix("input_boolean.")
            .unwrap_or(entity_id)
    }
}

/// Per-bootstrap collector for missing `input_boolean` declarations.
#[derive(Debug, Default)]
pub struct EntityTemplate {
    booleans: Vec<TemplateBoolean>,
}

#[derive(Debug)]
struct TemplateBoolean {
    object_id: String,
    friendly_name: String,
    icon: &'static str,
}

impl EntityTemplate {
    pub fn is_empty(&self) -> bool {
        self.booleans.is_empty()
    }

    fn add(&mut self, entity_id: &str, friendly_name: String, icon: &'static str) {
        self.booleans.push(TemplateBoolean {
            object_id: ManagedEntities::object_id(entity_id).to_string(),
            friendly_name,
            icon,
        });
    }

    /// Render this controller's block, sorted by object id for stable output.
    pub fn render(&self) -> String {
        let mut entries: Vec<&TemplateBoolean> = self.booleans.iter().collect();
        entries.sort_by(|a, b| a.object_id.cmp(&b.object_id));

        let mut out = String::new();
        for boolean in entries {
            out.push_str(&format!("  {}:\n", boolean.object_id));
            out.push_str(&format!("    name: {}\n", boolean.friendly_name));
            out.push_str(&format!("    icon: {}\n", boolean.icon));
        }
        out
    }

    /// Append this controller's block to the shared template file.
    ///
    /// The file header (`input_boolean:`) is written only when the file is
    /// created. An exclusive advisory lock serialises concurrent controllers
    /// appending in the same session.
    pub fn write_to(&self, directory: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(directory)
            .with_context(|| format!("creating template directory {}", directory.display()))?;
        let path = directory.join(ENTITY_TEMPLATE_FILENAME);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening template file {}", path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("locking template file {}", path.display()))?;

        let needs_header = file.metadata().map(|m| m.len() == 0).unwrap_or(true);
        let mut block = String::new();
        if needs_header {
            block.push_str("input_boolean:\n");
        }
        block.push_str(&self.render());

        let result = file.write_all(block.as_bytes());
        let _ = fs2::FileExt::unlock(&file);
        result.with_context(|| format!("appending to template file {}", path.display()))?;

        Ok(path)
    }
}

/// Outcome of the managed-entity bootstrap check.
pub enum EntityCheck {
    /// Every managed boolean exists in the host.
    Ready,
    /// Some booleans are missing; the template lists them.
    Missing(EntityTemplate),
}

/// Verify the managed booleans exist, collecting declarations for any that
/// don't.
pub fn check_managed_entities(
    host: &dyn HostAdapter,
    names: &ManagedEntities,
    display_name: &str,
    kind: DeviceKind,
) -> EntityCheck {
    let label = kind.display();
    let mut template = EntityTemplate::default();

    let mut require = |entity_id: &str, what: &str, icon: &'static str| {
        if !host.entity_exists(entity_id) {
            template.add(entity_id, format!("{label} {display_name} {what}"), icon);
        }
    };

    require(&names.locked, "locked", "mdi:lock");
    require(&names.locked_external, "locked external", "mdi:timer-lock");
    require(&names.manipulation_active, "manipulation active", "mdi:arrow-all");
    if let Some(active) = &names.solar_heating_active {
        require(active, "solar heating active", "mdi:sun-thermometer");
    }
    if let Some(status) = &names.solar_heating_status {
        require(status, "solar heating status", "mdi:sun-thermometer");
    }

    if template.is_empty() {
        EntityCheck::Ready
    } else {
        EntityCheck::Missing(template)
    }
}
