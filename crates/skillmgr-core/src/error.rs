use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStage {
    Lookup,
    Clone,
    Checkout,
    Pull,
    Erase,
}

impl TransportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::Clone => "clone",
            Self::Checkout => "checkout",
            Self::Pull => "pull",
            Self::Erase => "erase",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Runtime,
    System,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Runtime => "runtime",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkillError {
    #[error("no skill matches '{0}'")]
    NotFound(String),

    #[error("multiple skills match: {}", .0.join(", "))]
    Ambiguous(Vec<String>),

    #[error("too many skills match ({0})")]
    TooManyMatches(usize),

    #[error("skill '{0}' is already installed")]
    AlreadyInstalled(String),

    #[error("skill '{0}' is not installed")]
    AlreadyRemoved(String),

    #[error("skill '{0}' is already on its pre-release revision")]
    AlreadyPreRelease(String),

    #[error("{} failed: {cause}", .stage.as_str())]
    TransportFailure { stage: TransportStage, cause: String },

    #[error("{} dependency installation failed: {detail}", .kind.as_str())]
    DependencyFailure { kind: DependencyKind, detail: String },

    #[error("skill catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("state ledger is corrupt ({}): {detail}", .path.display())]
    LedgerCorrupt { path: PathBuf, detail: String },

    #[error("skill state unavailable: {0}")]
    StateUnavailable(String),

    #[error("cancelled")]
    Cancelled,
}

/// What the dialog layer should tell the user; it owns the wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    NotFound,
    MultipleMatches,
    TooManyMatches,
    AlreadyInstalled,
    AlreadyRemoved,
    AlreadyPreRelease,
    Filesystem,
    RuntimeRequirements,
    SystemRequirements,
    CatalogUnavailable,
    Other,
    Cancelled,
}

impl SkillError {
    pub fn transport(stage: TransportStage, cause: impl std::fmt::Display) -> Self {
        Self::TransportFailure {
            stage,
            cause: cause.to_string(),
        }
    }

    pub fn dependency(kind: DependencyKind, detail: impl std::fmt::Display) -> Self {
        Self::DependencyFailure {
            kind,
            detail: detail.to_string(),
        }
    }

    pub fn notice_kind(&self) -> NoticeKind {
        match self {
            Self::NotFound(_) => NoticeKind::NotFound,
            Self::Ambiguous(_) => NoticeKind::MultipleMatches,
            Self::TooManyMatches(_) => NoticeKind::TooManyMatches,
            Self::AlreadyInstalled(_) => NoticeKind::AlreadyInstalled,
            Self::AlreadyRemoved(_) => NoticeKind::AlreadyRemoved,
            Self::AlreadyPreRelease(_) => NoticeKind::AlreadyPreRelease,
            Self::TransportFailure { .. } => NoticeKind::Filesystem,
            Self::DependencyFailure {
                kind: DependencyKind::Runtime,
                ..
            } => NoticeKind::RuntimeRequirements,
            Self::DependencyFailure {
                kind: DependencyKind::System,
                ..
            } => NoticeKind::SystemRequirements,
            Self::CatalogUnavailable(_) => NoticeKind::CatalogUnavailable,
            Self::LedgerCorrupt { .. } | Self::StateUnavailable(_) => NoticeKind::Other,
            Self::Cancelled => NoticeKind::Cancelled,
        }
    }

    /// The skill name a notice should mention, when the error carries one.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::NotFound(name)
            | Self::AlreadyInstalled(name)
            | Self::AlreadyRemoved(name)
            | Self::AlreadyPreRelease(name) => Some(name),
            _ => None,
        }
    }
}

pub type SkillResult<T> = std::result::Result<T, SkillError>;
