use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use skillmgr_core::{DependencyKind, PackageIdentity, SkillError, SkillResult, TransportStage};
use tracing::{debug, warn};

use crate::{git_ls_remote_head, run_git_clone, run_git_command, Transport};

pub const RUNTIME_REQUIREMENTS_FILE: &str = "requirements.txt";
pub const SYSTEM_REQUIREMENTS_FILE: &str = "requirements.sh";

/// Clones and updates skills with the `git` binary, then runs the skill's
/// dependency scripts.
#[derive(Debug, Clone)]
pub struct GitTransport {
    runtime_command: Vec<String>,
    system_command: Vec<String>,
}

impl Default for GitTransport {
    fn default() -> Self {
        Self {
            runtime_command: vec!["pip".to_string(), "install".to_string(), "-r".to_string()],
            system_command: vec!["sh".to_string()],
        }
    }
}

impl GitTransport {
    pub fn new(runtime_command: Vec<String>, system_command: Vec<String>) -> Self {
        let defaults = Self::default();
        Self {
            runtime_command: if runtime_command.is_empty() {
                defaults.runtime_command
            } else {
                runtime_command
            },
            system_command: if system_command.is_empty() {
                defaults.system_command
            } else {
                system_command
            },
        }
    }

    pub(crate) fn install_dependencies(&self, skill_dir: &Path) -> SkillResult<()> {
        let runtime = skill_dir.join(RUNTIME_REQUIREMENTS_FILE);
        if runtime.is_file() {
            run_dependency_step(&self.runtime_command, &runtime, skill_dir)
                .map_err(|err| SkillError::dependency(DependencyKind::Runtime, format!("{err:#}")))?;
        }

        let system = skill_dir.join(SYSTEM_REQUIREMENTS_FILE);
        if system.is_file() {
            run_dependency_step(&self.system_command, &system, skill_dir)
                .map_err(|err| SkillError::dependency(DependencyKind::System, format!("{err:#}")))?;
        }
        Ok(())
    }
}

impl Transport for GitTransport {
    fn latest_revision(&self, identity: &PackageIdentity) -> SkillResult<String> {
        let url = remote_url(identity)?;
        git_ls_remote_head(url, &identity.name)
            .map_err(|err| SkillError::transport(TransportStage::Lookup, format!("{err:#}")))
    }

    fn fetch(
        &self,
        identity: &PackageIdentity,
        destination: &Path,
        revision: Option<&str>,
    ) -> SkillResult<()> {
        let url = remote_url(identity)?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                SkillError::transport(
                    TransportStage::Clone,
                    format!("failed creating {}: {err}", parent.display()),
                )
            })?;
        }

        run_git_clone(url, destination, &identity.name)
            .map_err(|err| SkillError::transport(TransportStage::Clone, format!("{err:#}")))?;

        let finished = checkout_revision(destination, revision, &identity.name)
            .and_then(|_| self.install_dependencies(destination));
        if let Err(err) = finished {
            // Partial trees must not look installed.
            if let Err(cleanup_err) = fs::remove_dir_all(destination) {
                warn!(
                    skill = %identity.name,
                    error = %cleanup_err,
                    "failed removing partially installed skill"
                );
            }
            return Err(err);
        }

        debug!(skill = %identity.name, revision = revision.unwrap_or("HEAD"), "fetched skill");
        Ok(())
    }

    fn update(
        &self,
        identity: &PackageIdentity,
        skill_dir: &Path,
        revision: Option<&str>,
    ) -> SkillResult<()> {
        run_git_command(skill_dir, &["fetch", "--quiet", "origin"], &identity.name)
            .map_err(|err| SkillError::transport(TransportStage::Pull, format!("{err:#}")))?;
        match revision {
            Some(_) => checkout_revision(skill_dir, revision, &identity.name)?,
            None => run_git_command(skill_dir, &["pull", "--quiet", "--ff-only"], &identity.name)
                .map_err(|err| SkillError::transport(TransportStage::Pull, format!("{err:#}")))?,
        }
        self.install_dependencies(skill_dir)?;

        debug!(skill = %identity.name, revision = revision.unwrap_or("HEAD"), "updated skill");
        Ok(())
    }

    fn erase(&self, skill_dir: &Path) -> SkillResult<()> {
        match fs::remove_dir_all(skill_dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SkillError::transport(
                TransportStage::Erase,
                format!("failed removing {}: {err}", skill_dir.display()),
            )),
        }
    }
}

fn remote_url(identity: &PackageIdentity) -> SkillResult<&str> {
    identity
        .url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| {
            SkillError::transport(
                TransportStage::Lookup,
                format!("skill '{}' has no remote url", identity.name),
            )
        })
}

fn checkout_revision(repo_root: &Path, revision: Option<&str>, label: &str) -> SkillResult<()> {
    let Some(revision) = revision else {
        return Ok(());
    };
    run_git_command(repo_root, &["checkout", "--quiet", revision], label)
        .map_err(|err| SkillError::transport(TransportStage::Checkout, format!("{err:#}")))
}

fn run_dependency_step(command: &[String], script: &Path, skill_dir: &Path) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        anyhow::bail!("dependency command is empty");
    };
    let output = Command::new(program)
        .args(args)
        .arg(script)
        .current_dir(skill_dir)
        .output()
        .with_context(|| format!("failed launching '{program}' for {}", script.display()))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!(
        "'{}' exited with {}: {}",
        program,
        output.status,
        stderr.trim()
    )
}
