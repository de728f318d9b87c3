use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallOrigin {
    Voice,
    Marketplace,
    #[default]
    Unspecified,
}

impl InstallOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::Marketplace => "marketplace",
            Self::Unspecified => "unspecified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallationStatus {
    Installed,
    Failed,
    Removed,
}

impl InstallationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Failed => "failed",
            Self::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    #[serde(default)]
    pub origin: InstallOrigin,
    #[serde(default)]
    pub is_pre_release: bool,
    pub installation_status: InstallationStatus,
    #[serde(default)]
    pub installed_at_epoch: u64,
    #[serde(default)]
    pub last_failure_message: String,
    #[serde(default)]
    pub last_updated_epoch: u64,
}

impl InstallationRecord {
    pub fn installed(origin: InstallOrigin, is_pre_release: bool, now: u64) -> Self {
        Self {
            origin,
            is_pre_release,
            installation_status: InstallationStatus::Installed,
            installed_at_epoch: now,
            last_failure_message: String::new(),
            last_updated_epoch: now,
        }
    }

    pub fn failed(
        origin: InstallOrigin,
        is_pre_release: bool,
        message: impl Into<String>,
        now: u64,
    ) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "unknown failure".to_string();
        }
        Self {
            origin,
            is_pre_release,
            installation_status: InstallationStatus::Failed,
            installed_at_epoch: 0,
            last_failure_message: message,
            last_updated_epoch: now,
        }
    }
}

/// Name-keyed installation state. Ordered so serialized output is stable.
pub type Ledger = BTreeMap<String, InstallationRecord>;
