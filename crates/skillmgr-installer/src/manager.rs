use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skillmgr_core::{parse_delta_entries, DesiredStateDelta, Ledger, SkillError, SkillResult};
use skillmgr_registry::{GitTransport, PackageCatalog, Transport};
use tracing::{error, info, warn};

use crate::{
    merge_outcomes, BatchApplier, DeviceIdentity, InstallLock, ManagerConfig, NoopObserver,
    Notifier, ReconciliationEngine, ReconciliationReport, Responder, SkillsLayout, StateLedger,
    SyncObserver, TelemetryUploader, VoiceCompletion,
};

/// The host-provided side of the manager.
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub device: Arc<dyn DeviceIdentity>,
    pub responder: Arc<dyn Responder>,
    pub notifier: Arc<dyn Notifier>,
    pub uploader: Arc<dyn TelemetryUploader>,
}

impl Collaborators {
    pub fn git_transport(config: &ManagerConfig) -> Arc<dyn Transport> {
        Arc::new(GitTransport::new(
            config.runtime_dependency_command.clone(),
            config.system_dependency_command.clone(),
        ))
    }
}

/// Remote settings payload. The delta lists may arrive as JSON arrays or as
/// strings holding a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsChange {
    #[serde(default)]
    pub installer_link: Option<String>,
    #[serde(default)]
    pub previous_link: Option<String>,
    #[serde(default)]
    pub auto_install: bool,
    #[serde(default)]
    pub to_install: Value,
    #[serde(default)]
    pub to_remove: Value,
}

pub struct SkillManager {
    pub(crate) layout: SkillsLayout,
    pub(crate) config: ManagerConfig,
    pub(crate) catalog: PackageCatalog,
    pub(crate) ledger: StateLedger,
    pub(crate) applier: BatchApplier,
    pub(crate) device: Arc<dyn DeviceIdentity>,
    pub(crate) responder: Arc<dyn Responder>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) uploader: Arc<dyn TelemetryUploader>,
}

impl SkillManager {
    pub fn new(
        layout: SkillsLayout,
        config: ManagerConfig,
        collaborators: Collaborators,
    ) -> Result<Self> {
        layout.ensure_base_dirs()?;
        let catalog = PackageCatalog::new(
            layout.state_dir(),
            layout.skills_dir(),
            collaborators.transport,
            config.refresh_interval_secs,
        );
        let ledger = StateLedger::new(layout.ledger_path());
        let applier = BatchApplier::new(config.effective_worker_count())?;

        Ok(Self {
            layout,
            config,
            catalog,
            ledger,
            applier,
            device: collaborators.device,
            responder: collaborators.responder,
            notifier: collaborators.notifier,
            uploader: collaborators.uploader,
        })
    }

    pub fn layout(&self) -> &SkillsLayout {
        &self.layout
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PackageCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &StateLedger {
        &self.ledger
    }

    pub fn sync(&self, delta: &DesiredStateDelta) -> SkillResult<ReconciliationReport> {
        self.sync_with(delta, &NoopObserver)
    }

    /// Reconciles installed skills with `delta` under the install lock.
    /// Item failures land in the ledger; only catalog or state failures
    /// abort the pass.
    pub fn sync_with(
        &self,
        delta: &DesiredStateDelta,
        observer: &dyn SyncObserver,
    ) -> SkillResult<ReconciliationReport> {
        let device_uuid = self.device.device_uuid();
        let lock = self.acquire_lock()?;
        let mut ledger = self.ledger.load_or_recover();

        let engine = ReconciliationEngine::new(&self.catalog, &self.applier);
        let plan = engine.plan(delta, &device_uuid)?;
        let report = if plan.is_empty() {
            info!("installed skills already match the requested state");
            ReconciliationReport {
                skipped: plan.skipped,
                ..ReconciliationReport::default()
            }
        } else {
            let report = engine.apply(plan, observer);
            if merge_outcomes(&mut ledger, &report, now_epoch()) {
                self.ledger.store(&ledger).map_err(state_unavailable)?;
            }
            report
        };
        drop(lock);

        for (name, reason) in report.installed.failed() {
            warn!(skill = %name, reason = %reason, "marketplace install failed");
        }
        for (name, reason) in report.removed.failed() {
            warn!(skill = %name, reason = %reason, "marketplace removal failed");
        }
        self.upload_snapshot(&ledger);
        Ok(report)
    }

    pub fn on_settings_change(&self, settings: &mut SettingsChange) -> Result<ReconciliationReport> {
        info!("skill installer settings changed");
        if let Err(err) = self.apply_installer_link(settings) {
            warn!(error = %err, "auto-install from link failed");
        }

        let to_install =
            parse_delta_entries(&settings.to_install).context("invalid to_install list")?;
        let to_remove =
            parse_delta_entries(&settings.to_remove).context("invalid to_remove list")?;
        let report = self.sync(&DesiredStateDelta::new(to_install, to_remove))?;
        Ok(report)
    }

    /// Installs `installer_link` when auto-install is on and the link changed
    /// since `previous_link`. `Ok(None)` means there was nothing to install.
    pub fn apply_installer_link(
        &self,
        settings: &mut SettingsChange,
    ) -> SkillResult<Option<VoiceCompletion>> {
        let link = settings
            .installer_link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
            .map(str::to_string);
        let Some(link) = link else {
            return Ok(None);
        };
        if !settings.auto_install || settings.previous_link.as_deref() == Some(link.as_str()) {
            return Ok(None);
        }

        settings.previous_link = Some(link.clone());
        self.install_from_link(&link).map(Some)
    }

    /// Sends `ledger` to the uploader when uploads are enabled. Failures are
    /// only logged.
    pub fn upload_snapshot(&self, ledger: &Ledger) {
        if !self.config.upload_skill_manifest {
            return;
        }
        if let Err(err) = self.uploader.upload(ledger) {
            error!(error = %format!("{err:#}"), "failed uploading the skills manifest");
        }
    }

    pub(crate) fn acquire_lock(&self) -> SkillResult<InstallLock> {
        InstallLock::acquire(&self.layout.lock_path()).map_err(state_unavailable)
    }
}

pub(crate) fn state_unavailable(err: anyhow::Error) -> SkillError {
    SkillError::StateUnavailable(format!("{err:#}"))
}

pub(crate) fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
