use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub stable_revision: Option<String>,
}

impl PackageIdentity {
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
            url: None,
            stable_revision: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_stable_revision(mut self, revision: impl Into<String>) -> Self {
        self.stable_revision = Some(revision.into());
        self
    }

    /// `name.author`, or the bare name for skills without a known author.
    pub fn qualified_name(&self) -> String {
        if self.author.is_empty() {
            return self.name.clone();
        }
        format!("{}.{}", self.name, self.author)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevisionSelector {
    Stable,
    PreRelease,
}

impl RevisionSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::PreRelease => "pre-release",
        }
    }

    /// `None` selects the newest pre-release revision.
    pub fn is_pre_release(selector: Option<Self>) -> bool {
        !matches!(selector, Some(Self::Stable))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locality {
    LocalOnly,
    RemoteOnly,
}

impl Locality {
    pub fn admits(&self, is_local: bool) -> bool {
        match self {
            Self::LocalOnly => is_local,
            Self::RemoteOnly => !is_local,
        }
    }
}

/// Repository name from a clone URL: last path segment without `.git`.
pub fn extract_repo_name(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let segment = trimmed.rsplit(['/', ':']).next()?;
    let name = segment.strip_suffix(".git").unwrap_or(segment);
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}
