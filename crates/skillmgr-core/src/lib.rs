mod delta;
mod error;
mod identity;
mod listing;
mod outcome;
mod record;

pub use delta::{base_name, parse_delta_entries, DeltaEntry, DesiredStateDelta, ScopedDelta};
pub use error::{DependencyKind, NoticeKind, SkillError, SkillResult, TransportStage};
pub use identity::{extract_repo_name, Locality, PackageIdentity, RevisionSelector};
pub use listing::{validate_skill_name, SkillListing};
pub use outcome::{BatchOutcome, BatchResult};
pub use record::{InstallOrigin, InstallationRecord, InstallationStatus, Ledger};

#[cfg(test)]
mod tests;
