use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use skillmgr_core::SkillListing;

use crate::{
    compute_filesystem_snapshot_id, copy_source_to_temp, git_head_snapshot_id, listing_files,
    read_snapshot_id, run_git_clone, run_git_command, unique_suffix,
    validate_staged_source_layout, write_snapshot_file, SkillSourceKind, SkillSourceRecord,
    SkillSourceStore, SourceUpdateStatus,
};

pub(crate) fn update_source(
    store: &SkillSourceStore,
    source: &SkillSourceRecord,
) -> Result<(SourceUpdateStatus, String)> {
    let staged_root = store
        .state_root
        .join(format!("tmp-{}-{}", source.name, unique_suffix()));

    let prepared = match source.kind {
        SkillSourceKind::Filesystem => stage_filesystem_source(source, &staged_root),
        SkillSourceKind::Git => stage_git_source(store, source, &staged_root),
    };
    let snapshot_id = match prepared {
        Ok(snapshot_id) => snapshot_id,
        Err(err) => {
            let _ = fs::remove_dir_all(&staged_root);
            return Err(err);
        }
    };

    finalize_staged_source_update(store, source, staged_root, snapshot_id)
}

fn stage_filesystem_source(source: &SkillSourceRecord, staged_root: &Path) -> Result<String> {
    copy_source_to_temp(&PathBuf::from(&source.location), staged_root, &source.name)?;
    compute_filesystem_snapshot_id(staged_root)
}

fn stage_git_source(
    store: &SkillSourceStore,
    source: &SkillSourceRecord,
    staged_root: &Path,
) -> Result<String> {
    let cached = store.cache_root(&source.name);
    if cached.join(".git").is_dir() {
        copy_source_to_temp(&cached, staged_root, &source.name)?;
        run_git_command(
            staged_root,
            &["fetch", "--prune", "--quiet", "--", source.location.as_str()],
            &source.name,
        )?;
        run_git_command(staged_root, &["reset", "--hard", "--quiet", "FETCH_HEAD"], &source.name)?;
    } else {
        run_git_clone(&source.location, staged_root, &source.name)?;
    }
    git_head_snapshot_id(staged_root, &source.name)
}

/// Every listing must parse and be stored under its own name.
pub(crate) fn verify_staged_listings(staged_root: &Path, source_name: &str) -> Result<u64> {
    let mut count = 0_u64;
    for path in listing_files(&staged_root.join("index"))? {
        let raw = fs::read_to_string(&path).with_context(|| {
            format!(
                "source-metadata-invalid: source '{}' failed reading {}",
                source_name,
                path.display()
            )
        })?;
        let listing = SkillListing::from_toml_str(&raw).with_context(|| {
            format!(
                "source-metadata-invalid: source '{}' listing {} is invalid",
                source_name,
                path.display()
            )
        })?;
        let stem = path.file_stem().and_then(|value| value.to_str());
        if stem != Some(listing.name.as_str()) {
            anyhow::bail!(
                "source-metadata-invalid: source '{}' listing {} declares name '{}'",
                source_name,
                path.display(),
                listing.name
            );
        }
        count += 1;
    }
    Ok(count)
}

fn finalize_staged_source_update(
    store: &SkillSourceStore,
    source: &SkillSourceRecord,
    staged_root: PathBuf,
    snapshot_id: String,
) -> Result<(SourceUpdateStatus, String)> {
    let verified = validate_staged_source_layout(&staged_root, &source.name)
        .and_then(|_| verify_staged_listings(&staged_root, &source.name));
    let listing_count = match verified {
        Ok(count) => count,
        Err(err) => {
            let _ = fs::remove_dir_all(&staged_root);
            return Err(err);
        }
    };

    let destination = store.cache_root(&source.name);
    let existing_snapshot_id = read_snapshot_id(&destination);
    let cache_dir = store.state_root.join("cache");
    fs::create_dir_all(&cache_dir).with_context(|| {
        format!(
            "source-sync-failed: source '{}' failed creating cache root {}",
            source.name,
            cache_dir.display()
        )
    })?;

    let backup = cache_dir.join(format!(".{}-backup-{}", source.name, unique_suffix()));
    let had_existing = destination.exists();
    if had_existing {
        fs::rename(&destination, &backup).with_context(|| {
            format!(
                "source-sync-failed: source '{}' failed backing up cache {}",
                source.name,
                destination.display()
            )
        })?;
    }

    let swapped = fs::rename(&staged_root, &destination)
        .with_context(|| {
            format!(
                "source-sync-failed: source '{}' failed replacing cache {}",
                source.name,
                destination.display()
            )
        })
        .and_then(|_| write_snapshot_file(&destination, &source.name, &snapshot_id, listing_count));

    if let Err(err) = swapped {
        let _ = fs::remove_dir_all(&staged_root);
        let _ = fs::remove_dir_all(&destination);
        if had_existing {
            if let Err(restore_err) = fs::rename(&backup, &destination) {
                return Err(anyhow::anyhow!(
                    "source-sync-failed: source '{}' failed replacing cache {}: {:#}; failed restoring backup {}: {}",
                    source.name,
                    destination.display(),
                    err,
                    backup.display(),
                    restore_err
                ));
            }
        }
        return Err(err);
    }

    if had_existing {
        let _ = fs::remove_dir_all(&backup);
    }

    let status = if existing_snapshot_id.as_deref() == Some(snapshot_id.as_str()) {
        SourceUpdateStatus::UpToDate
    } else {
        SourceUpdateStatus::Updated
    };
    Ok((status, snapshot_id))
}
