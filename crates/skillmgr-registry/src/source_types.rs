use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillSourceKind {
    Git,
    Filesystem,
}

impl SkillSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Filesystem => "filesystem",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSourceRecord {
    pub name: String,
    pub kind: SkillSourceKind,
    pub location: String,
    #[serde(default = "crate::source_types::source_enabled_default")]
    pub enabled: bool,
    pub priority: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceUpdateStatus {
    Updated,
    UpToDate,
    Fresh,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUpdateResult {
    pub name: String,
    pub status: SourceUpdateStatus,
    pub snapshot_id: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillSourceWithSnapshotState {
    pub source: SkillSourceRecord,
    pub snapshot: SkillSourceSnapshotState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillSourceSnapshotState {
    None,
    Ready {
        snapshot_id: String,
        updated_at_unix: u64,
        listing_count: u64,
    },
    Error {
        reason_code: String,
    },
}

pub(crate) fn source_enabled_default() -> bool {
    true
}
