use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use skillmgr_core::SkillListing;

use crate::{
    listing_files, parse_source_state_file, sort_sources, source_has_ready_snapshot,
    SkillSourceRecord, SkillSourceStateFile,
};

#[derive(Debug, Clone)]
pub struct ListingIndex {
    root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ConfiguredListingIndex {
    sources: Vec<ConfiguredSnapshotSource>,
}

#[derive(Debug, Clone)]
struct ConfiguredSnapshotSource {
    name: String,
    index: ListingIndex,
}

impl ListingIndex {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn listings(&self) -> Result<Vec<SkillListing>> {
        let index_root = self.root.join("index");
        if !index_root.exists() {
            return Ok(Vec::new());
        }

        let mut listings = Vec::new();
        for path in listing_files(&index_root)? {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed reading listing: {}", path.display()))?;
            let listing = SkillListing::from_toml_str(&content)
                .with_context(|| format!("failed parsing listing: {}", path.display()))?;
            listings.push(listing);
        }

        listings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listings)
    }
}

impl ConfiguredListingIndex {
    pub fn open(state_root: impl Into<PathBuf>) -> Result<Self> {
        let state_root = state_root.into();
        let sources_path = state_root.join("sources.toml");
        let (state, has_sources_file) = match fs::read_to_string(&sources_path) {
            Ok(content) => {
                let state = parse_source_state_file(&content).with_context(|| {
                    format!(
                        "failed parsing configured skill sources: {}",
                        sources_path.display()
                    )
                })?;
                (state, true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                (SkillSourceStateFile::default(), false)
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!(
                        "failed reading configured skill sources: {}",
                        sources_path.display()
                    )
                });
            }
        };

        let mut enabled_sources: Vec<SkillSourceRecord> = state
            .sources
            .into_iter()
            .filter(|source| source.enabled)
            .collect();
        let enabled_count = enabled_sources.len();
        sort_sources(&mut enabled_sources);

        let mut configured = Vec::new();
        for source in enabled_sources {
            let cache_root = state_root.join("cache").join(&source.name);
            if !source_has_ready_snapshot(&cache_root) {
                continue;
            }
            configured.push(ConfiguredSnapshotSource {
                name: source.name,
                index: ListingIndex::open(cache_root),
            });
        }

        if !configured.is_empty() || !has_sources_file || enabled_count == 0 {
            return Ok(Self {
                sources: configured,
            });
        }

        anyhow::bail!("no ready snapshot exists for enabled sources")
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources
            .iter()
            .map(|source| source.name.as_str())
            .collect()
    }

    /// Listings across all ready sources. When two sources publish the same
    /// name, the higher priority source wins.
    pub fn listings(&self) -> Result<Vec<SkillListing>> {
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for source in &self.sources {
            let listings = source.index.listings().with_context(|| {
                format!("failed loading listings from source '{}'", source.name)
            })?;
            for listing in listings {
                if seen.insert(listing.name.clone()) {
                    merged.push(listing);
                }
            }
        }

        merged.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(merged)
    }
}
