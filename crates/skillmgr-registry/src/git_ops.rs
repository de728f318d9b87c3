use std::path::Path;
use std::process::{Command, Output};

use anyhow::{Context, Result};

pub(crate) fn base_git_command() -> Command {
    let mut command = Command::new("git");
    command
        .arg("-c")
        .arg("core.autocrlf=false")
        .arg("-c")
        .arg("advice.detachedHead=false");
    if cfg!(windows) {
        command.arg("-c").arg("core.longpaths=true");
    }
    command
}

fn ensure_success(output: &Output, label: &str, what: &str) -> Result<()> {
    if !output.status.success() {
        anyhow::bail!(
            "'{}' git {} failed: {}",
            label,
            what,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

pub(crate) fn run_git_clone(location: &str, destination: &Path, label: &str) -> Result<()> {
    let output = base_git_command()
        .arg("clone")
        .arg("--quiet")
        .arg("--")
        .arg(location)
        .arg(destination)
        .output()
        .with_context(|| format!("'{label}' failed launching git clone"))?;
    ensure_success(&output, label, "clone")
}

pub(crate) fn run_git_command(repo_root: &Path, args: &[&str], label: &str) -> Result<()> {
    let output = base_git_command()
        .args(args)
        .current_dir(repo_root)
        .output()
        .with_context(|| format!("'{}' failed launching git {}", label, args.join(" ")))?;
    ensure_success(&output, label, &args.join(" "))
}

pub(crate) fn git_head_snapshot_id(repo_root: &Path, label: &str) -> Result<String> {
    let output = base_git_command()
        .arg("rev-parse")
        .arg("HEAD")
        .current_dir(repo_root)
        .output()
        .with_context(|| format!("'{label}' failed launching git rev-parse"))?;
    ensure_success(&output, label, "rev-parse")?;

    let full_sha = String::from_utf8(output.stdout)
        .context("git rev-parse produced non-UTF-8 output")?;
    derive_snapshot_id_from_full_git_sha(&full_sha)
        .with_context(|| format!("'{label}' git rev-parse returned invalid HEAD sha"))
}

/// Newest commit on the remote's default branch.
pub(crate) fn git_ls_remote_head(location: &str, label: &str) -> Result<String> {
    let output = base_git_command()
        .arg("ls-remote")
        .arg("--")
        .arg(location)
        .arg("HEAD")
        .output()
        .with_context(|| format!("'{label}' failed launching git ls-remote"))?;
    ensure_success(&output, label, "ls-remote")?;

    let stdout = String::from_utf8(output.stdout)
        .context("git ls-remote produced non-UTF-8 output")?;
    parse_ls_remote_head(&stdout).with_context(|| format!("'{label}' remote has no HEAD"))
}

pub(crate) fn parse_ls_remote_head(stdout: &str) -> Result<String> {
    for line in stdout.lines() {
        let mut fields = line.split_whitespace();
        let (Some(sha), Some(reference)) = (fields.next(), fields.next()) else {
            continue;
        };
        if reference == "HEAD" && sha.len() >= 7 && sha.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Ok(sha.to_string());
        }
    }
    anyhow::bail!("no HEAD reference in ls-remote output")
}

pub(crate) fn derive_snapshot_id_from_full_git_sha(full_sha: &str) -> Result<String> {
    let normalized = full_sha.trim();
    if normalized.len() < 16 {
        anyhow::bail!("git HEAD sha too short for snapshot id: '{normalized}'");
    }
    if !normalized.chars().all(|ch| ch.is_ascii_hexdigit()) {
        anyhow::bail!("git HEAD sha contains non-hex characters: '{normalized}'");
    }

    Ok(format!(
        "git:{}",
        normalized.chars().take(16).collect::<String>()
    ))
}
