use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillsLayout {
    prefix: PathBuf,
}

impl SkillsLayout {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn skills_dir(&self) -> PathBuf {
        self.prefix.join("skills")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.prefix.join("state")
    }

    pub fn config_path(&self) -> PathBuf {
        self.prefix.join("config.toml")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.state_dir().join("skills.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir().join("install.lock")
    }

    pub fn device_uuid_path(&self) -> PathBuf {
        self.state_dir().join("device_uuid")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [self.skills_dir(), self.state_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_user_prefix() -> Result<PathBuf> {
    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows user prefix")?;
        return Ok(PathBuf::from(app_data).join("Skillmgr"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve user prefix")?;
    Ok(PathBuf::from(home).join(".skillmgr"))
}
