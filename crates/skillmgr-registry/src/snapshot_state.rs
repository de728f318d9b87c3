use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{current_unix_timestamp, SkillSourceSnapshotState};

const SNAPSHOT_FILE: &str = "snapshot.json";

#[derive(Debug, Serialize, Deserialize)]
struct SourceSnapshotFile {
    version: u32,
    source: String,
    snapshot_id: String,
    updated_at_unix: u64,
    listing_count: u64,
    status: String,
}

pub(crate) fn write_snapshot_file(
    cache_root: &Path,
    source_name: &str,
    snapshot_id: &str,
    listing_count: u64,
) -> Result<()> {
    let snapshot_path = cache_root.join(SNAPSHOT_FILE);
    let snapshot = SourceSnapshotFile {
        version: 1,
        source: source_name.to_string(),
        snapshot_id: snapshot_id.to_string(),
        updated_at_unix: current_unix_timestamp(),
        listing_count,
        status: "ready".to_string(),
    };
    let content = serde_json::to_string_pretty(&snapshot)
        .with_context(|| format!("failed serializing snapshot {}", snapshot_path.display()))?;
    fs::write(&snapshot_path, content)
        .with_context(|| format!("failed writing snapshot {}", snapshot_path.display()))
}

fn read_snapshot_file(cache_root: &Path) -> Option<SourceSnapshotFile> {
    let content = fs::read_to_string(cache_root.join(SNAPSHOT_FILE)).ok()?;
    serde_json::from_str::<SourceSnapshotFile>(&content).ok()
}

pub(crate) fn read_snapshot_id(cache_root: &Path) -> Option<String> {
    read_snapshot_file(cache_root).map(|snapshot| snapshot.snapshot_id)
}

pub(crate) fn read_snapshot_state(cache_root: &Path) -> SkillSourceSnapshotState {
    let snapshot_path = cache_root.join(SNAPSHOT_FILE);
    let content = match fs::read_to_string(&snapshot_path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return SkillSourceSnapshotState::None;
        }
        Err(_) => {
            return SkillSourceSnapshotState::Error {
                reason_code: "snapshot-unreadable".to_string(),
            };
        }
    };

    match serde_json::from_str::<SourceSnapshotFile>(&content) {
        Ok(snapshot) if snapshot.status == "ready" => SkillSourceSnapshotState::Ready {
            snapshot_id: snapshot.snapshot_id,
            updated_at_unix: snapshot.updated_at_unix,
            listing_count: snapshot.listing_count,
        },
        Ok(_) => SkillSourceSnapshotState::Error {
            reason_code: "snapshot-invalid".to_string(),
        },
        Err(_) => SkillSourceSnapshotState::Error {
            reason_code: "snapshot-unreadable".to_string(),
        },
    }
}

pub(crate) fn source_has_ready_snapshot(cache_root: &Path) -> bool {
    matches!(
        read_snapshot_state(cache_root),
        SkillSourceSnapshotState::Ready { .. }
    )
}

/// A ready snapshot refreshed less than `max_age_secs` ago.
pub(crate) fn snapshot_is_fresh(cache_root: &Path, max_age_secs: u64, now: u64) -> bool {
    match read_snapshot_state(cache_root) {
        SkillSourceSnapshotState::Ready {
            updated_at_unix, ..
        } => now.saturating_sub(updated_at_unix) < max_age_secs,
        _ => false,
    }
}
