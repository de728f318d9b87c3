use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Replaces `staged_root` with a copy of the tree at `source_path`.
pub(crate) fn copy_source_to_temp(
    source_path: &Path,
    staged_root: &Path,
    source_name: &str,
) -> Result<()> {
    if !source_path.is_dir() {
        anyhow::bail!(
            "source-sync-failed: source '{}' is not a directory: {}",
            source_name,
            source_path.display()
        );
    }
    if staged_root.exists() {
        fs::remove_dir_all(staged_root).with_context(|| {
            format!("failed clearing staging directory {}", staged_root.display())
        })?;
    }

    for relative in relative_files(source_path, true)? {
        let from = source_path.join(&relative);
        let to = staged_root.join(&relative);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed creating directory {}", parent.display()))?;
        }
        fs::copy(&from, &to).with_context(|| {
            format!(
                "source-sync-failed: source '{}' failed copying {}",
                source_name,
                from.display()
            )
        })?;
    }
    fs::create_dir_all(staged_root)
        .with_context(|| format!("failed creating staging directory {}", staged_root.display()))?;
    Ok(())
}

pub(crate) fn validate_staged_source_layout(staged_root: &Path, source_name: &str) -> Result<()> {
    if !staged_root.join("index").is_dir() {
        anyhow::bail!(
            "source-snapshot-missing: source '{}' has no index/ directory in {}",
            source_name,
            staged_root.display()
        );
    }
    Ok(())
}

/// `*.toml` files directly under `index_root`, sorted by path.
pub(crate) fn listing_files(index_root: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(index_root)
        .with_context(|| format!("failed reading index directory {}", index_root.display()))?;
    let mut listings = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let is_toml = path.extension().is_some_and(|extension| extension == "toml");
        if is_toml && entry.file_type()?.is_file() {
            listings.push(path);
        }
    }
    listings.sort();
    Ok(listings)
}

/// Digest over every file's `/`-joined relative path and content hash.
/// `.git` is ignored so a filesystem copy of a checkout hashes like its
/// working tree.
pub(crate) fn compute_filesystem_snapshot_id(root: &Path) -> Result<String> {
    let mut files = relative_files(root, false)?;
    files.sort();

    let mut digest = Sha256::new();
    for relative in files {
        let bytes = fs::read(root.join(&relative)).with_context(|| {
            format!("failed reading {} for snapshot", root.join(&relative).display())
        })?;
        let key = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        digest.update(key.as_bytes());
        digest.update([0]);
        digest.update(sha256_hex(&bytes).as_bytes());
        digest.update([0]);
    }

    let full = hex::encode(digest.finalize());
    Ok(format!("fs:{}", &full[..16]))
}

fn relative_files(root: &Path, include_git: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("failed reading directory {}", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if include_git || entry.file_name() != ".git" {
                    pending.push(entry.path());
                }
            } else if file_type.is_file() {
                let path = entry.path();
                let relative = path
                    .strip_prefix(root)
                    .with_context(|| format!("{} escapes {}", path.display(), root.display()))?;
                files.push(relative.to_path_buf());
            }
        }
    }
    Ok(files)
}

pub(crate) fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Nanosecond stamp for temp and backup directory names.
pub(crate) fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}
