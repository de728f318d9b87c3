use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::SkillSourceRecord;

const SOURCE_STATE_VERSION: u32 = 1;
const MAX_SOURCE_NAME_LEN: usize = 64;

/// On-disk shape of `sources.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SkillSourceStateFile {
    #[serde(default = "current_state_version")]
    pub(crate) version: u32,
    #[serde(default)]
    pub(crate) sources: Vec<SkillSourceRecord>,
}

impl Default for SkillSourceStateFile {
    fn default() -> Self {
        Self {
            version: SOURCE_STATE_VERSION,
            sources: Vec::new(),
        }
    }
}

fn current_state_version() -> u32 {
    SOURCE_STATE_VERSION
}

pub(crate) fn parse_source_state_file(content: &str) -> Result<SkillSourceStateFile> {
    let state: SkillSourceStateFile =
        toml::from_str(content).context("failed parsing skill source state")?;
    if state.version != SOURCE_STATE_VERSION {
        anyhow::bail!(
            "unsupported source state version {} (expected {SOURCE_STATE_VERSION})",
            state.version
        );
    }

    let mut names = HashSet::new();
    for source in &state.sources {
        validate_source_name(&source.name)?;
        validate_source_location(source)?;
        if !names.insert(source.name.as_str()) {
            anyhow::bail!("duplicate source name '{}' in sources.toml", source.name);
        }
    }
    Ok(state)
}

/// Lower priority value first, then name.
pub(crate) fn sort_sources(sources: &mut [SkillSourceRecord]) {
    sources.sort_by(|left, right| (left.priority, &left.name).cmp(&(right.priority, &right.name)));
}

/// Source names become cache directory names: `[a-z0-9][a-z0-9_-]*`, at
/// most 64 characters.
pub(crate) fn validate_source_name(name: &str) -> Result<()> {
    let allowed = |ch: char| ch.is_ascii_lowercase() || ch.is_ascii_digit();
    let valid = match name.chars().next() {
        Some(first) => {
            name.len() <= MAX_SOURCE_NAME_LEN
                && allowed(first)
                && name.chars().all(|ch| allowed(ch) || ch == '-' || ch == '_')
        }
        None => false,
    };
    if !valid {
        anyhow::bail!(
            "invalid source name '{name}': use 1-{MAX_SOURCE_NAME_LEN} lowercase letters, digits, '-' or '_'"
        );
    }
    Ok(())
}

pub(crate) fn validate_source_location(source: &SkillSourceRecord) -> Result<()> {
    if source.location.trim().is_empty() {
        anyhow::bail!("invalid source location for '{}': must not be empty", source.name);
    }
    Ok(())
}

/// All sources when `target_names` is empty, otherwise exactly the named
/// ones in configured order.
pub(crate) fn select_update_sources(
    sources: &[SkillSourceRecord],
    target_names: &[String],
) -> Result<Vec<SkillSourceRecord>> {
    if target_names.is_empty() {
        return Ok(sources.to_vec());
    }

    if let Some(unknown) = target_names
        .iter()
        .find(|name| !sources.iter().any(|source| &source.name == *name))
    {
        anyhow::bail!("source-not-found: source '{unknown}' not found");
    }
    Ok(sources
        .iter()
        .filter(|source| target_names.contains(&source.name))
        .cloned()
        .collect())
}
