use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::identity::PackageIdentity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillListing {
    pub name: String,
    #[serde(default)]
    pub author: String,
    pub url: String,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SkillListing {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let listing: Self = toml::from_str(input).context("failed to parse skill listing")?;
        validate_skill_name(&listing.name)?;
        if listing.url.trim().is_empty() {
            return Err(anyhow!("skill '{}' has an empty url", listing.name));
        }
        if listing.author.contains('.') {
            return Err(anyhow!(
                "author '{}' for skill '{}' must not contain '.'",
                listing.author,
                listing.name
            ));
        }
        if let Some(revision) = &listing.revision {
            if revision.is_empty() || !revision.chars().all(|ch| ch.is_ascii_hexdigit()) {
                return Err(anyhow!(
                    "revision for skill '{}' must be a hex commit id: '{}'",
                    listing.name,
                    revision
                ));
            }
        }
        Ok(listing)
    }

    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity {
            name: self.name.clone(),
            author: self.author.clone(),
            url: Some(self.url.clone()),
            stable_revision: self.revision.clone(),
        }
    }
}

pub fn validate_skill_name(name: &str) -> anyhow::Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("skill name must not be empty"));
    }
    if trimmed != name {
        return Err(anyhow!("skill name must not have surrounding whitespace: '{name}'"));
    }
    if name.contains('.') || name.contains('/') || name.contains('\\') {
        return Err(anyhow!("skill name contains invalid character(s): '{name}'"));
    }
    if name == ".." || name.starts_with('-') {
        return Err(anyhow!("invalid skill name: '{name}'"));
    }
    Ok(())
}
