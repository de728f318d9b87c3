use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use skillmgr_core::{PackageIdentity, RevisionSelector, SkillResult};

/// Moves skill trees between a remote and the local skills directory.
pub trait Transport: Send + Sync {
    /// Newest revision published on the remote's default branch.
    fn latest_revision(&self, identity: &PackageIdentity) -> SkillResult<String>;

    fn fetch(
        &self,
        identity: &PackageIdentity,
        destination: &Path,
        revision: Option<&str>,
    ) -> SkillResult<()>;

    fn update(
        &self,
        identity: &PackageIdentity,
        skill_dir: &Path,
        revision: Option<&str>,
    ) -> SkillResult<()>;

    fn erase(&self, skill_dir: &Path) -> SkillResult<()>;
}

#[derive(Clone)]
pub struct PackageHandle {
    identity: PackageIdentity,
    selector: Option<RevisionSelector>,
    skill_dir: PathBuf,
    transport: Arc<dyn Transport>,
}

impl PackageHandle {
    pub fn new(
        identity: PackageIdentity,
        skill_dir: impl Into<PathBuf>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            identity,
            selector: Some(RevisionSelector::Stable),
            skill_dir: skill_dir.into(),
            transport,
        }
    }

    pub fn with_selector(mut self, selector: Option<RevisionSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn selector(&self) -> Option<RevisionSelector> {
        self.selector
    }

    pub fn is_pre_release(&self) -> bool {
        RevisionSelector::is_pre_release(self.selector)
    }

    pub fn skill_dir(&self) -> &Path {
        &self.skill_dir
    }

    pub fn is_local(&self) -> bool {
        self.skill_dir.is_dir()
    }

    /// Revision the next fetch or update checks out. Pre-release selectors
    /// ask the remote every time.
    pub fn target_revision(&self) -> SkillResult<Option<String>> {
        match self.selector {
            Some(RevisionSelector::Stable) => Ok(self.identity.stable_revision.clone()),
            Some(RevisionSelector::PreRelease) | None => {
                self.transport.latest_revision(&self.identity).map(Some)
            }
        }
    }

    pub fn fetch(&self) -> SkillResult<()> {
        let revision = self.target_revision()?;
        self.transport
            .fetch(&self.identity, &self.skill_dir, revision.as_deref())
    }

    pub fn update(&self) -> SkillResult<()> {
        let revision = self.target_revision()?;
        self.transport
            .update(&self.identity, &self.skill_dir, revision.as_deref())
    }

    pub fn erase(&self) -> SkillResult<()> {
        self.transport.erase(&self.skill_dir)
    }
}

impl fmt::Debug for PackageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageHandle")
            .field("identity", &self.identity)
            .field("selector", &self.selector)
            .field("skill_dir", &self.skill_dir)
            .finish_non_exhaustive()
    }
}
