use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    current_unix_timestamp, parse_source_state_file, read_snapshot_id, read_snapshot_state,
    select_update_sources, snapshot_is_fresh, sort_sources, update_source, validate_source_location,
    validate_source_name, SkillSourceRecord, SkillSourceStateFile, SkillSourceWithSnapshotState,
    SourceUpdateResult, SourceUpdateStatus,
};

#[derive(Debug, Clone)]
pub struct SkillSourceStore {
    pub(crate) state_root: PathBuf,
}

impl SkillSourceStore {
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        Self {
            state_root: state_root.into(),
        }
    }

    pub fn add_source(&self, source: SkillSourceRecord) -> Result<()> {
        validate_source_name(&source.name)?;
        validate_source_location(&source)?;

        let mut state = self.load_state()?;
        if state
            .sources
            .iter()
            .any(|existing| existing.name == source.name)
        {
            anyhow::bail!("source '{}' already exists", source.name);
        }

        state.sources.push(source);
        self.save_state(&state)
    }

    pub fn list_sources(&self) -> Result<Vec<SkillSourceRecord>> {
        Ok(self.load_state()?.sources)
    }

    pub fn list_sources_with_snapshot_state(&self) -> Result<Vec<SkillSourceWithSnapshotState>> {
        Ok(self
            .load_state()?
            .sources
            .into_iter()
            .map(|source| {
                let snapshot = read_snapshot_state(&self.cache_root(&source.name));
                SkillSourceWithSnapshotState { source, snapshot }
            })
            .collect())
    }

    pub fn remove_source(&self, name: &str, purge_cache: bool) -> Result<()> {
        let mut state = self.load_state()?;
        let before = state.sources.len();
        state.sources.retain(|source| source.name != name);
        if state.sources.len() == before {
            anyhow::bail!("source '{}' not found", name);
        }
        self.save_state(&state)?;

        if purge_cache {
            let cache_path = self.cache_root(name);
            if cache_path.exists() {
                fs::remove_dir_all(&cache_path).with_context(|| {
                    format!("failed purging source cache: {}", cache_path.display())
                })?;
            }
        }
        Ok(())
    }

    pub fn update_sources(&self, target_names: &[String]) -> Result<Vec<SourceUpdateResult>> {
        self.update_sources_older_than(target_names, 0)
    }

    /// Refreshes the selected enabled sources, skipping any whose ready
    /// snapshot is younger than `max_age_secs`. Per-source failures are
    /// reported in the results, never raised.
    pub fn update_sources_older_than(
        &self,
        target_names: &[String],
        max_age_secs: u64,
    ) -> Result<Vec<SourceUpdateResult>> {
        let state = self.load_state()?;
        let selected = select_update_sources(&state.sources, target_names)?;
        let now = current_unix_timestamp();

        let mut results = Vec::with_capacity(selected.len());
        for source in selected.into_iter().filter(|source| source.enabled) {
            let cache_root = self.cache_root(&source.name);
            if max_age_secs > 0 && snapshot_is_fresh(&cache_root, max_age_secs, now) {
                debug!(source = %source.name, "source snapshot is fresh, skipping refresh");
                results.push(SourceUpdateResult {
                    snapshot_id: read_snapshot_id(&cache_root).unwrap_or_default(),
                    name: source.name,
                    status: SourceUpdateStatus::Fresh,
                    error: None,
                });
                continue;
            }

            match update_source(self, &source) {
                Ok((status, snapshot_id)) => results.push(SourceUpdateResult {
                    name: source.name,
                    status,
                    snapshot_id,
                    error: None,
                }),
                Err(err) => {
                    debug!(source = %source.name, error = %format!("{err:#}"), "source refresh failed");
                    results.push(SourceUpdateResult {
                        name: source.name,
                        status: SourceUpdateStatus::Failed,
                        snapshot_id: String::new(),
                        error: Some(format!("{err:#}")),
                    });
                }
            }
        }

        Ok(results)
    }

    pub fn state_root(&self) -> &Path {
        &self.state_root
    }

    pub(crate) fn cache_root(&self, source_name: &str) -> PathBuf {
        self.state_root.join("cache").join(source_name)
    }

    pub(crate) fn sources_file_path(&self) -> PathBuf {
        self.state_root.join("sources.toml")
    }

    pub(crate) fn load_state(&self) -> Result<SkillSourceStateFile> {
        let path = self.sources_file_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SkillSourceStateFile::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed reading source state: {}", path.display()));
            }
        };

        let mut state = parse_source_state_file(&content)
            .with_context(|| format!("failed parsing source state: {}", path.display()))?;
        sort_sources(&mut state.sources);
        Ok(state)
    }

    fn save_state(&self, state: &SkillSourceStateFile) -> Result<()> {
        fs::create_dir_all(&self.state_root).with_context(|| {
            format!(
                "failed creating source state root: {}",
                self.state_root.display()
            )
        })?;

        let path = self.sources_file_path();
        let mut state = state.clone();
        sort_sources(&mut state.sources);
        let content = toml::to_string(&state)
            .with_context(|| format!("failed serializing source state: {}", path.display()))?;
        fs::write(&path, content)
            .with_context(|| format!("failed writing source state: {}", path.display()))
    }
}
