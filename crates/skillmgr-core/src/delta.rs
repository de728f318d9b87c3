use std::collections::BTreeSet;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaEntry {
    pub name: String,
    #[serde(default)]
    pub devices: Option<Vec<String>>,
}

impl DeltaEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            devices: None,
        }
    }

    pub fn for_devices(name: impl Into<String>, devices: &[&str]) -> Self {
        Self {
            name: name.into(),
            devices: Some(devices.iter().map(|v| (*v).to_string()).collect()),
        }
    }

    /// Absent and empty device lists both target every device.
    pub fn applies_to(&self, device_uuid: &str) -> bool {
        match &self.devices {
            None => true,
            Some(devices) if devices.is_empty() => true,
            Some(devices) => devices.iter().any(|device| device == device_uuid),
        }
    }

    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }
}

/// `name.author` reduces to `name`.
pub fn base_name(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.split('.').next().unwrap_or(trimmed)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredStateDelta {
    #[serde(default)]
    pub to_install: Vec<DeltaEntry>,
    #[serde(default)]
    pub to_remove: Vec<DeltaEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopedDelta {
    pub to_install: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
    pub out_of_scope: Vec<String>,
}

impl DesiredStateDelta {
    pub fn new(to_install: Vec<DeltaEntry>, to_remove: Vec<DeltaEntry>) -> Self {
        Self {
            to_install,
            to_remove,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_install.is_empty() && self.to_remove.is_empty()
    }

    /// Applies the device scope filter and name normalization, then breaks
    /// install/remove ties toward removal.
    pub fn scoped(&self, device_uuid: &str) -> ScopedDelta {
        let mut scoped = ScopedDelta::default();
        let mut collect = |entries: &[DeltaEntry], into: &mut BTreeSet<String>| {
            for entry in entries {
                if !entry.applies_to(device_uuid) {
                    scoped.out_of_scope.push(entry.name.clone());
                    continue;
                }
                let name = entry.base_name();
                if !name.is_empty() {
                    into.insert(name.to_string());
                }
            }
        };

        let mut to_install = BTreeSet::new();
        let mut to_remove = BTreeSet::new();
        collect(&self.to_install, &mut to_install);
        collect(&self.to_remove, &mut to_remove);

        to_install.retain(|name| !to_remove.contains(name));
        scoped.to_install = to_install;
        scoped.to_remove = to_remove;
        scoped
    }
}

/// Accepts either a JSON array of entries or a JSON string holding one; the
/// marketplace backend sends both shapes.
pub fn parse_delta_entries(value: &Value) -> anyhow::Result<Vec<DeltaEntry>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(raw) => {
            if raw.trim().is_empty() {
                return Ok(Vec::new());
            }
            let inner: Value =
                serde_json::from_str(raw).context("failed to parse delta list string as JSON")?;
            if inner.is_string() {
                return Err(anyhow!("delta list string must contain a JSON array"));
            }
            parse_delta_entries(&inner)
        }
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(name) => Ok(DeltaEntry::new(name.clone())),
                Value::Object(_) => serde_json::from_value::<DeltaEntry>(item.clone())
                    .context("invalid delta entry"),
                other => Err(anyhow!("invalid delta entry: {other}")),
            })
            .collect(),
        other => Err(anyhow!("delta list must be an array, got: {other}")),
    }
}
