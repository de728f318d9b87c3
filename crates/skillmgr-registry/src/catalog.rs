use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use skillmgr_core::{Locality, PackageIdentity, SkillError, SkillResult};
use skillmgr_resolver::{disambiguate, resolve_identity, Disambiguation, Resolution};
use tracing::{debug, warn};

use crate::{
    ConfiguredListingIndex, PackageHandle, SkillSourceStore, SourceUpdateResult,
    SourceUpdateStatus, Transport,
};

/// Everything installable or installed: source listings plus skill
/// directories that no source publishes.
pub struct PackageCatalog {
    sources: SkillSourceStore,
    skills_dir: PathBuf,
    transport: Arc<dyn Transport>,
    refresh_interval_secs: u64,
}

impl PackageCatalog {
    pub fn new(
        state_root: impl Into<PathBuf>,
        skills_dir: impl Into<PathBuf>,
        transport: Arc<dyn Transport>,
        refresh_interval_secs: u64,
    ) -> Self {
        Self {
            sources: SkillSourceStore::new(state_root),
            skills_dir: skills_dir.into(),
            transport,
            refresh_interval_secs,
        }
    }

    pub fn sources(&self) -> &SkillSourceStore {
        &self.sources
    }

    pub fn skills_dir(&self) -> &Path {
        &self.skills_dir
    }

    /// Refreshes stale sources. Individual source failures are logged and
    /// leave that source's previous snapshot in place.
    pub fn refresh(&self) -> Result<Vec<SourceUpdateResult>> {
        let results = self
            .sources
            .update_sources_older_than(&[], self.refresh_interval_secs)?;
        for result in &results {
            match result.status {
                SourceUpdateStatus::Failed => warn!(
                    source = %result.name,
                    error = result.error.as_deref().unwrap_or(""),
                    "source refresh failed, using cached listings"
                ),
                _ => debug!(
                    source = %result.name,
                    status = ?result.status,
                    snapshot = %result.snapshot_id,
                    "source refreshed"
                ),
            }
        }
        Ok(results)
    }

    pub fn list(&self) -> SkillResult<Vec<PackageHandle>> {
        if let Err(err) = self.refresh() {
            warn!(error = %format!("{err:#}"), "skill source refresh failed");
        }

        let index = ConfiguredListingIndex::open(self.sources.state_root())
            .map_err(|err| SkillError::CatalogUnavailable(format!("{err:#}")))?;
        let listings = index
            .listings()
            .map_err(|err| SkillError::CatalogUnavailable(format!("{err:#}")))?;

        let mut identities = BTreeMap::new();
        for listing in listings {
            identities.insert(listing.name.clone(), listing.identity());
        }
        let local_names = self
            .local_skill_names()
            .map_err(|err| SkillError::CatalogUnavailable(format!("{err:#}")))?;
        for name in local_names {
            identities
                .entry(name.clone())
                .or_insert_with(|| PackageIdentity::new(name, ""));
        }

        Ok(identities
            .into_values()
            .map(|identity| self.handle_for(identity))
            .collect())
    }

    pub fn resolve(&self, query: &str) -> SkillResult<PackageHandle> {
        self.resolve_with_locality(query, None)
    }

    /// Resolves `query`; on ambiguity the candidates are narrowed by
    /// `locality` before the caller is asked to choose.
    pub fn resolve_with_locality(
        &self,
        query: &str,
        locality: Option<Locality>,
    ) -> SkillResult<PackageHandle> {
        let handles = self.list()?;
        let candidates = match resolve_in(query, &handles) {
            Resolution::Unique(index) => return Ok(handles[index].clone()),
            Resolution::NotFound => return Err(SkillError::NotFound(query.to_string())),
            Resolution::Ambiguous(indices) => indices
                .into_iter()
                .map(|index| handles[index].clone())
                .collect::<Vec<_>>(),
        };

        let Some(locality) = locality else {
            return Err(SkillError::Ambiguous(handle_names(&candidates)));
        };
        match disambiguate(candidates, |handle| locality.admits(handle.is_local())) {
            Disambiguation::One(handle) => Ok(handle),
            Disambiguation::NoneLeft => Err(SkillError::NotFound(query.to_string())),
            Disambiguation::TooMany(count) => Err(SkillError::TooManyMatches(count)),
            Disambiguation::Prompt(remaining) => {
                Err(SkillError::Ambiguous(handle_names(&remaining)))
            }
        }
    }

    /// Re-runs resolution restricted to a previous candidate set.
    pub fn resolve_among(&self, query: &str, candidates: &[String]) -> SkillResult<PackageHandle> {
        let handles = self
            .list()?
            .into_iter()
            .filter(|handle| candidates.iter().any(|name| name == handle.name()))
            .collect::<Vec<_>>();
        match resolve_in(query, &handles) {
            Resolution::Unique(index) => Ok(handles[index].clone()),
            Resolution::NotFound => Err(SkillError::NotFound(query.to_string())),
            Resolution::Ambiguous(indices) => Err(SkillError::Ambiguous(
                indices
                    .into_iter()
                    .map(|index| handles[index].name().to_string())
                    .collect(),
            )),
        }
    }

    pub fn handle_for(&self, identity: PackageIdentity) -> PackageHandle {
        let skill_dir = self.skills_dir.join(&identity.name);
        PackageHandle::new(identity, skill_dir, Arc::clone(&self.transport))
    }

    fn local_skill_names(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.skills_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed reading skills directory {}", self.skills_dir.display())
                });
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}

fn resolve_in(query: &str, handles: &[PackageHandle]) -> Resolution {
    let identities = handles
        .iter()
        .map(|handle| handle.identity().clone())
        .collect::<Vec<_>>();
    resolve_identity(query, &identities)
}

fn handle_names(handles: &[PackageHandle]) -> Vec<String> {
    handles
        .iter()
        .map(|handle| handle.name().to_string())
        .collect()
}
