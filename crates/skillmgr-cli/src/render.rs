use std::io::IsTerminal;
use std::sync::Mutex;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};
use skillmgr_core::{BatchOutcome, Ledger, NoticeKind};
use skillmgr_installer::{
    BatchOperation, Notice, Notifier, Prompt, ReconciliationPlan, ReconciliationReport,
    SkillAction, SyncObserver,
};
use skillmgr_registry::PackageHandle;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    resolve_output_style(
        std::io::stdout().is_terminal(),
        std::io::stderr().is_terminal(),
    )
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool, _stderr_is_tty: bool) -> OutputStyle {
    if stdout_is_tty {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        _ => "[..]",
    }
}

pub(crate) fn render_section_header(style: OutputStyle, title: &str) -> Option<String> {
    match style {
        OutputStyle::Plain => None,
        OutputStyle::Rich => Some(colorize(section_style(), &format!("== {title} =="))),
    }
}

/// Status and wording for a notice. The installer only says what happened.
pub(crate) fn notice_line(notice: &Notice) -> (&'static str, String) {
    match notice {
        Notice::Completed { name, action } => ("ok", completion_message(name, *action)),
        Notice::Cancelled => ("warn", "cancelled, nothing was changed".to_string()),
        Notice::Failed { kind, name } => {
            let name = name.as_deref().unwrap_or("that skill");
            ("err", failure_message(*kind, name))
        }
        Notice::AmbiguousPrompt(candidates) => (
            "step",
            format!("several skills match: {}", candidates.join(", ")),
        ),
        Notice::AvailableSkills(names) if names.is_empty() => (
            "step",
            "every skill in the catalog is already installed".to_string(),
        ),
        Notice::AvailableSkills(names) => (
            "step",
            format!("some skills you can install: {}", names.join(", ")),
        ),
    }
}

fn completion_message(name: &str, action: SkillAction) -> String {
    match action {
        SkillAction::Installed => format!("installed {name}"),
        SkillAction::InstalledPreRelease => format!("installed the pre-release of {name}"),
        SkillAction::Removed => format!("removed {name}"),
    }
}

fn failure_message(kind: NoticeKind, name: &str) -> String {
    match kind {
        NoticeKind::NotFound => format!("no skill matches '{name}'"),
        NoticeKind::MultipleMatches => format!("several skills match '{name}'"),
        NoticeKind::TooManyMatches => {
            format!("too many skills match '{name}', try a more specific name")
        }
        NoticeKind::AlreadyInstalled => format!("{name} is already installed"),
        NoticeKind::AlreadyRemoved => format!("{name} is not installed"),
        NoticeKind::AlreadyPreRelease => format!("{name} is already on its pre-release"),
        NoticeKind::Filesystem => format!("could not download or delete {name}"),
        NoticeKind::RuntimeRequirements => {
            format!("{name} was fetched but its runtime requirements failed to install")
        }
        NoticeKind::SystemRequirements => {
            format!("{name} was fetched but its system requirements failed to install")
        }
        NoticeKind::CatalogUnavailable => "the skill catalog is unavailable".to_string(),
        NoticeKind::Cancelled => "cancelled, nothing was changed".to_string(),
        NoticeKind::Other => format!("something went wrong with {name}"),
    }
}

pub(crate) fn prompt_text(prompt: &Prompt) -> String {
    match prompt {
        Prompt::ConfirmInstall {
            name,
            reinstall: false,
        } => format!("Install {name}? [yes/no]"),
        Prompt::ConfirmInstall {
            name,
            reinstall: true,
        } => format!("{name} is on its pre-release. Reinstall the stable release? [yes/no]"),
        Prompt::ConfirmPreRelease {
            name,
            upgrade: false,
        } => format!("Install the pre-release of {name}? [yes/no]"),
        Prompt::ConfirmPreRelease {
            name,
            upgrade: true,
        } => format!("Switch {name} to its pre-release? [yes/no]"),
        Prompt::ConfirmRemove { name } => format!("Remove {name}? [yes/no]"),
        Prompt::ChooseSkill { candidates } => {
            format!("Which one did you mean: {}?", candidates.join(", "))
        }
    }
}

pub(crate) fn render_prompt(style: OutputStyle, prompt: &Prompt) -> String {
    let text = prompt_text(prompt);
    match style {
        OutputStyle::Plain => text,
        OutputStyle::Rich => colorize(prompt_style(), &text),
    }
}

pub(crate) struct TerminalNotifier {
    style: OutputStyle,
}

impl TerminalNotifier {
    pub(crate) fn new(style: OutputStyle) -> Self {
        Self { style }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        let (status, message) = notice_line(&notice);
        println!("{}", render_status_line(self.style, status, &message));
    }
}

/// One progress bar across both batches of a sync pass.
pub(crate) struct SyncProgress {
    style: OutputStyle,
    bar: Mutex<Option<ProgressBar>>,
}

impl SyncProgress {
    pub(crate) fn new(style: OutputStyle) -> Self {
        Self {
            style,
            bar: Mutex::new(None),
        }
    }

    pub(crate) fn finish(&self) {
        if let Some(bar) = self.bar.lock().ok().and_then(|mut slot| slot.take()) {
            bar.finish_and_clear();
        }
    }
}

impl SyncObserver for SyncProgress {
    fn planned(&self, plan: &ReconciliationPlan) {
        let total = (plan.to_install.len() + plan.to_remove.len()) as u64;
        if self.style == OutputStyle::Plain || total == 0 {
            return;
        }

        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.cyan.bold} {msg:<24} [{bar:20.cyan/blue}] {pos:>3}/{len:3} {elapsed_precise}",
        ) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.set_message("sync");
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn item_finished(&self, operation: BatchOperation, name: &str, _outcome: &BatchOutcome) {
        let Ok(slot) = self.bar.lock() else {
            return;
        };
        if let Some(bar) = slot.as_ref() {
            bar.set_message(format!("{} {name}", operation.as_str()));
            bar.inc(1);
        }
    }
}

pub(crate) fn format_sync_report_lines(
    report: &ReconciliationReport,
    style: OutputStyle,
) -> Vec<String> {
    let mut lines = Vec::new();
    for (name, outcome) in &report.installed.items {
        lines.push(match outcome {
            BatchOutcome::Success => render_status_line(style, "ok", &format!("installed {name}")),
            BatchOutcome::Failure(reason) => {
                render_status_line(style, "err", &format!("install {name} failed: {reason}"))
            }
        });
    }
    for (name, outcome) in &report.removed.items {
        lines.push(match outcome {
            BatchOutcome::Success => render_status_line(style, "ok", &format!("removed {name}")),
            BatchOutcome::Failure(reason) => {
                render_status_line(style, "err", &format!("remove {name} failed: {reason}"))
            }
        });
    }
    for entry in &report.skipped {
        lines.push(render_status_line(
            style,
            "step",
            &format!("skipped {} ({})", entry.name, entry.reason.as_str()),
        ));
    }

    let failed = report.installed.failed().count() + report.removed.failed().count();
    lines.push(format!(
        "sync summary: installed={} removed={} failed={failed} skipped={}",
        report.installed.succeeded().count(),
        report.removed.succeeded().count(),
        report.skipped.len()
    ));
    lines
}

pub(crate) fn format_skill_list_lines(handles: &[PackageHandle], ledger: &Ledger) -> Vec<String> {
    handles
        .iter()
        .map(|handle| {
            let label = handle.identity().qualified_name();
            if !handle.is_local() {
                return format!("{label} available");
            }
            match ledger.get(handle.name()) {
                Some(record) => format!(
                    "{label} installed origin={} channel={}",
                    record.origin.as_str(),
                    if record.is_pre_release {
                        "pre-release"
                    } else {
                        "stable"
                    }
                ),
                None => format!("{label} installed origin=unknown"),
            }
        })
        .collect()
}

pub(crate) fn format_ledger_lines(ledger: &Ledger) -> Vec<String> {
    if ledger.is_empty() {
        return vec!["No recorded skills".to_string()];
    }

    ledger
        .iter()
        .map(|(name, record)| {
            let mut line = format!(
                "{name} status={} origin={} pre-release={} installed-at={} updated-at={}",
                record.installation_status.as_str(),
                record.origin.as_str(),
                record.is_pre_release,
                record.installed_at_epoch,
                record.last_updated_epoch
            );
            if !record.last_failure_message.is_empty() {
                line.push_str(&format!(" failure=\"{}\"", record.last_failure_message));
            }
            line
        })
        .collect()
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn prompt_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
