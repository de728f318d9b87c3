use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use skillmgr_core::{InstallationRecord, Ledger, SkillError, SkillResult};
use tracing::error;

const LEDGER_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    #[serde(default)]
    skills: Ledger,
}

/// Name-keyed installation metadata persisted as JSON. Each store is an
/// atomic replace; callers serialize read-modify-write with the install
/// lock.
#[derive(Debug, Clone)]
pub struct StateLedger {
    path: PathBuf,
}

impl StateLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> SkillResult<Ledger> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Ledger::new()),
            Err(err) => return Err(self.corrupt(format!("unreadable: {err}"))),
        };

        let file: LedgerFile =
            serde_json::from_str(&raw).map_err(|err| self.corrupt(err.to_string()))?;
        if file.version != LEDGER_VERSION {
            return Err(self.corrupt(format!(
                "unsupported ledger version {} (expected {LEDGER_VERSION})",
                file.version
            )));
        }
        Ok(file.skills)
    }

    /// Proceeds with an empty ledger when the persisted one is corrupt.
    pub fn load_or_recover(&self) -> Ledger {
        match self.load() {
            Ok(ledger) => ledger,
            Err(err) => {
                error!(
                    path = %self.path.display(),
                    error = %err,
                    "installed-skill ledger is corrupt, continuing with an empty ledger"
                );
                Ledger::new()
            }
        }
    }

    pub fn store(&self, ledger: &Ledger) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let file = LedgerFile {
            version: LEDGER_VERSION,
            skills: ledger.clone(),
        };
        let mut content =
            serde_json::to_string_pretty(&file).context("failed serializing skill ledger")?;
        content.push('\n');

        let mut temp = tempfile::Builder::new()
            .prefix(".skills-")
            .suffix(".json.tmp")
            .tempfile_in(parent)
            .with_context(|| format!("failed creating temp ledger in {}", parent.display()))?;
        temp.write_all(content.as_bytes())
            .context("failed writing temp ledger")?;
        temp.flush().context("failed flushing temp ledger")?;
        temp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed replacing ledger {}", self.path.display()))?;
        Ok(())
    }

    /// Applies `mutator` to one record and writes the result. Returning
    /// `None` deletes the record.
    pub fn merge<F>(&self, name: &str, mutator: F) -> Result<Ledger>
    where
        F: FnOnce(Option<InstallationRecord>) -> Option<InstallationRecord>,
    {
        let mut ledger = self.load_or_recover();
        let current = ledger.remove(name);
        if let Some(updated) = mutator(current) {
            ledger.insert(name.to_string(), updated);
        }
        self.store(&ledger)?;
        Ok(ledger)
    }

    fn corrupt(&self, detail: String) -> SkillError {
        SkillError::LedgerCorrupt {
            path: self.path.clone(),
            detail,
        }
    }
}
