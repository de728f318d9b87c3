use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use skillmgr_core::{parse_delta_entries, DeltaEntry, DesiredStateDelta, SkillError, SkillResult};
use skillmgr_installer::{
    default_user_prefix, ChannelResponder, Collaborators, DeviceIdentity, ManagerConfig,
    NoopUploader, SettingsChange, SkillManager, SkillsLayout, StaticDeviceIdentity,
    TelemetryUploader,
};
use skillmgr_registry::{
    SkillSourceKind, SkillSourceRecord, SkillSourceSnapshotState, SkillSourceStore,
    SkillSourceWithSnapshotState, SourceUpdateResult, SourceUpdateStatus,
};
use tracing::debug;

use crate::completion::write_completions_script;
use crate::prompt::spawn_stdin_prompter;
use crate::render::{
    current_output_style, format_ledger_lines, format_skill_list_lines, format_sync_report_lines,
    render_section_header, render_status_line, OutputStyle, SyncProgress, TerminalNotifier,
};
use crate::telemetry::HttpManifestUploader;
use crate::{Cli, Commands, SourceCommands};

pub(crate) fn run_cli(cli: Cli) -> Result<u8> {
    let prefix = resolve_prefix(cli.prefix, std::env::var_os("SKILLMGR_PREFIX"))?;
    let layout = SkillsLayout::new(prefix);
    let output_style = current_output_style();
    debug!(prefix = %layout.prefix().display(), "resolved skill prefix");

    match cli.command {
        Commands::Install { skill, beta } => {
            let manager = build_manager(&layout, output_style)?;
            let result = match (skill, beta) {
                (Some(skill), true) => manager.install_pre_release(&skill).map(|_| ()),
                (skill, _) => manager.install_intent(skill.as_deref()).map(|_| ()),
            };
            Ok(voice_exit_status(&result))
        }
        Commands::Remove { skill } => {
            let manager = build_manager(&layout, output_style)?;
            Ok(voice_exit_status(&manager.remove(&skill)))
        }
        Commands::Available => {
            let manager = build_manager(&layout, output_style)?;
            Ok(voice_exit_status(&manager.available_skills()))
        }
        Commands::InstallLink { url } => {
            let manager = build_manager(&layout, output_style)?;
            Ok(voice_exit_status(&manager.install_from_link(&url)))
        }
        Commands::List => {
            let manager = build_manager(&layout, output_style)?;
            let handles = manager.catalog().list()?;
            let ledger = manager.ledger().load()?;
            if let Some(header) = render_section_header(output_style, "skills") {
                println!("{header}");
            }
            for line in format_skill_list_lines(&handles, &ledger) {
                println!("{line}");
            }
            Ok(0)
        }
        Commands::Sync {
            install,
            remove,
            link,
        } => {
            let delta = DesiredStateDelta::new(
                parse_delta_arg(&install, "install")?,
                parse_delta_arg(&remove, "remove")?,
            );
            let manager = build_manager(&layout, output_style)?;
            let link_status = match link {
                Some(link) => {
                    let mut settings = SettingsChange {
                        installer_link: Some(link),
                        auto_install: true,
                        ..SettingsChange::default()
                    };
                    link_exit_status(&manager.apply_installer_link(&mut settings))
                }
                None => 0,
            };

            let progress = SyncProgress::new(output_style);
            let result = manager.sync_with(&delta, &progress);
            progress.finish();
            let report = result?;
            for line in format_sync_report_lines(&report, output_style) {
                println!("{line}");
            }
            Ok(link_status)
        }
        Commands::Source { command } => {
            let store = SkillSourceStore::new(layout.state_dir());
            run_source_command(&store, command, output_style)?;
            Ok(0)
        }
        Commands::Ledger => {
            let manager = build_manager(&layout, output_style)?;
            for line in format_ledger_lines(&manager.ledger().load()?) {
                println!("{line}");
            }
            Ok(0)
        }
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout();
            write_completions_script(shell, &mut stdout)?;
            Ok(0)
        }
    }
}

pub(crate) fn resolve_prefix(flag: Option<PathBuf>, env: Option<OsString>) -> Result<PathBuf> {
    if let Some(prefix) = flag {
        return Ok(prefix);
    }
    if let Some(prefix) = env.filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(prefix));
    }
    default_user_prefix()
}

fn build_manager(layout: &SkillsLayout, output_style: OutputStyle) -> Result<SkillManager> {
    let config = ManagerConfig::load(&layout.config_path())?;
    layout.ensure_base_dirs()?;
    let device = StaticDeviceIdentity::load_or_create(
        config.device_uuid.as_deref(),
        &layout.device_uuid_path(),
    )?;
    let uploader = select_uploader(&config, &device)?;

    let (responder, endpoint) = ChannelResponder::new();
    spawn_stdin_prompter(endpoint, output_style)?;

    let collaborators = Collaborators {
        transport: Collaborators::git_transport(&config),
        device: Arc::new(device),
        responder: Arc::new(responder),
        notifier: Arc::new(TerminalNotifier::new(output_style)),
        uploader,
    };
    SkillManager::new(layout.clone(), config, collaborators)
}

fn select_uploader(
    config: &ManagerConfig,
    device: &StaticDeviceIdentity,
) -> Result<Arc<dyn TelemetryUploader>> {
    let url = config
        .telemetry_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty());
    match url {
        Some(url) if config.upload_skill_manifest => Ok(Arc::new(HttpManifestUploader::new(
            url,
            device.device_uuid(),
        )?)),
        _ => Ok(Arc::new(NoopUploader)),
    }
}

pub(crate) fn parse_delta_arg(raw: &str, field: &str) -> Result<Vec<DeltaEntry>> {
    parse_delta_entries(&Value::String(raw.to_string()))
        .with_context(|| format!("invalid --{field} list"))
}

/// Voice commands report through notices; the exit status only says whether
/// the request went through.
pub(crate) fn voice_exit_status<T>(result: &SkillResult<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(SkillError::Cancelled) => 2,
        Err(_) => 1,
    }
}

/// An already installed link does not fail a sync.
pub(crate) fn link_exit_status<T>(result: &SkillResult<T>) -> u8 {
    match result {
        Err(SkillError::AlreadyInstalled(_)) => 0,
        other => voice_exit_status(other),
    }
}

fn run_source_command(
    store: &SkillSourceStore,
    command: SourceCommands,
    output_style: OutputStyle,
) -> Result<()> {
    match command {
        SourceCommands::Add {
            name,
            location,
            kind,
            priority,
        } => {
            let kind: SkillSourceKind = kind.into();
            let output_lines = format_source_add_lines(&name, kind, priority);
            store.add_source(SkillSourceRecord {
                name,
                kind,
                location,
                enabled: true,
                priority,
            })?;
            for line in output_lines {
                println!("{line}");
            }
        }
        SourceCommands::List => {
            let sources = store.list_sources_with_snapshot_state()?;
            for line in format_source_list_lines(sources) {
                println!("{line}");
            }
        }
        SourceCommands::Remove { name, purge_cache } => {
            store.remove_source(&name, purge_cache)?;
            for line in format_source_remove_lines(&name, purge_cache) {
                println!("{line}");
            }
        }
        SourceCommands::Update { sources } => {
            let results = store.update_sources(&sources)?;
            let report = build_update_report(&results);
            for line in format_update_output_lines(&report, output_style) {
                println!("{line}");
            }
            println!(
                "{}",
                format_update_summary_line(report.updated, report.up_to_date, report.failed)
            );
            ensure_update_succeeded(report.failed)?;
        }
    }
    Ok(())
}

pub(crate) fn format_source_add_lines(
    name: &str,
    kind: SkillSourceKind,
    priority: u32,
) -> Vec<String> {
    vec![
        format!("added source {name}"),
        format!("kind: {}", kind.as_str()),
        format!("priority: {priority}"),
    ]
}

pub(crate) fn format_source_remove_lines(name: &str, purge_cache: bool) -> Vec<String> {
    let cache_state = if purge_cache { "purged" } else { "kept" };
    vec![
        format!("removed source {name}"),
        format!("cache: {cache_state}"),
    ]
}

fn format_snapshot_state(snapshot: &SkillSourceSnapshotState) -> String {
    match snapshot {
        SkillSourceSnapshotState::None => "none".to_string(),
        SkillSourceSnapshotState::Ready {
            snapshot_id,
            listing_count,
            ..
        } => format!("ready:{snapshot_id} listings={listing_count}"),
        SkillSourceSnapshotState::Error { reason_code } => format!("error:{reason_code}"),
    }
}

pub(crate) fn format_source_list_lines(
    mut sources: Vec<SkillSourceWithSnapshotState>,
) -> Vec<String> {
    if sources.is_empty() {
        return vec!["No configured sources".to_string()];
    }

    sources.sort_by(|left, right| {
        left.source
            .priority
            .cmp(&right.source.priority)
            .then_with(|| left.source.name.cmp(&right.source.name))
    });
    sources
        .into_iter()
        .map(|source| {
            format!(
                "{} kind={} priority={} enabled={} location={} snapshot={}",
                source.source.name,
                source.source.kind.as_str(),
                source.source.priority,
                source.source.enabled,
                source.source.location,
                format_snapshot_state(&source.snapshot)
            )
        })
        .collect()
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct UpdateReport {
    pub(crate) lines: Vec<String>,
    pub(crate) updated: u32,
    pub(crate) up_to_date: u32,
    pub(crate) failed: u32,
}

pub(crate) fn build_update_report(results: &[SourceUpdateResult]) -> UpdateReport {
    let mut report = UpdateReport::default();
    for result in results {
        match result.status {
            SourceUpdateStatus::Updated => {
                report.updated += 1;
                report.lines.push(format!(
                    "{}: updated (snapshot={})",
                    result.name, result.snapshot_id
                ));
            }
            SourceUpdateStatus::UpToDate => {
                report.up_to_date += 1;
                report.lines.push(format!(
                    "{}: up-to-date (snapshot={})",
                    result.name, result.snapshot_id
                ));
            }
            SourceUpdateStatus::Fresh => {
                report.up_to_date += 1;
                report.lines.push(format!(
                    "{}: fresh (snapshot={})",
                    result.name, result.snapshot_id
                ));
            }
            SourceUpdateStatus::Failed => {
                report.failed += 1;
                let reason = update_failure_reason_code(result.error.as_deref());
                report
                    .lines
                    .push(format!("{}: failed (reason={reason})", result.name));
            }
        }
    }
    report
}

pub(crate) fn format_update_output_lines(
    report: &UpdateReport,
    output_style: OutputStyle,
) -> Vec<String> {
    report
        .lines
        .iter()
        .map(|line| {
            let status = if line.contains(": updated") {
                "ok"
            } else if line.contains(": failed") {
                "err"
            } else {
                "step"
            };
            render_status_line(output_style, status, line)
        })
        .collect()
}

pub(crate) fn ensure_update_succeeded(failed: u32) -> Result<()> {
    if failed > 0 {
        return Err(anyhow!("source update failed"));
    }
    Ok(())
}

pub(crate) fn format_update_summary_line(updated: u32, up_to_date: u32, failed: u32) -> String {
    format!("update summary: updated={updated} up-to-date={up_to_date} failed={failed}")
}

pub(crate) fn update_failure_reason_code(error: Option<&str>) -> String {
    let Some(error) = error else {
        return "unknown".to_string();
    };

    for segment in error.split(':') {
        let candidate = segment.trim();
        if !candidate.is_empty()
            && candidate
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch == '-' || ch.is_ascii_digit())
        {
            return candidate.to_string();
        }
    }

    "unknown".to_string()
}
