use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use skillmgr_core::Ledger;
use tracing::info;
use uuid::Uuid;

pub trait DeviceIdentity: Send + Sync {
    fn device_uuid(&self) -> String;
}

pub trait TelemetryUploader: Send + Sync {
    fn upload(&self, ledger: &Ledger) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticDeviceIdentity {
    uuid: String,
}

impl StaticDeviceIdentity {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self { uuid: uuid.into() }
    }

    /// Uses `configured` when set, otherwise the uuid stored at `path`,
    /// generating and storing one on first use.
    pub fn load_or_create(configured: Option<&str>, path: &Path) -> Result<Self> {
        if let Some(uuid) = configured.map(str::trim).filter(|uuid| !uuid.is_empty()) {
            return Ok(Self::new(uuid));
        }

        match fs::read_to_string(path) {
            Ok(raw) if !raw.trim().is_empty() => return Ok(Self::new(raw.trim())),
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed reading device uuid: {}", path.display()));
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let uuid = Uuid::new_v4().to_string();
        fs::write(path, format!("{uuid}\n"))
            .with_context(|| format!("failed writing device uuid: {}", path.display()))?;
        info!(device = %uuid, "generated device uuid");
        Ok(Self::new(uuid))
    }
}

impl DeviceIdentity for StaticDeviceIdentity {
    fn device_uuid(&self) -> String {
        self.uuid.clone()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUploader;

impl TelemetryUploader for NoopUploader {
    fn upload(&self, _ledger: &Ledger) -> Result<()> {
        Ok(())
    }
}
