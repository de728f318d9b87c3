use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    pub worker_count: usize,
    pub confirmation_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    pub affirmative_words: Vec<String>,
    pub upload_skill_manifest: bool,
    pub telemetry_url: Option<String>,
    pub device_uuid: Option<String>,
    pub runtime_dependency_command: Vec<String>,
    pub system_dependency_command: Vec<String>,
    pub available_skills_limit: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            confirmation_timeout_secs: 30,
            refresh_interval_secs: 3600,
            affirmative_words: ["yes", "yeah", "yep", "sure", "ok", "okay", "affirmative"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            upload_skill_manifest: false,
            telemetry_url: None,
            device_uuid: None,
            runtime_dependency_command: vec![
                "pip".to_string(),
                "install".to_string(),
                "-r".to_string(),
            ],
            system_dependency_command: vec!["sh".to_string()],
            available_skills_limit: 4,
        }
    }
}

impl ManagerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).context("failed to parse skillmgr config")
    }

    /// Defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .with_context(|| format!("invalid config file: {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                Err(err).with_context(|| format!("failed reading config: {}", path.display()))
            }
        }
    }

    pub fn effective_worker_count(&self) -> usize {
        self.worker_count.clamp(MIN_WORKERS, MAX_WORKERS)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}
