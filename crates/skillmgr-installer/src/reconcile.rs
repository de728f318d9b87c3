use skillmgr_core::{
    BatchOutcome, BatchResult, DesiredStateDelta, InstallOrigin, InstallationRecord, Ledger,
    SkillResult,
};
use skillmgr_registry::{PackageCatalog, PackageHandle};
use tracing::{debug, info, warn};

use crate::{BatchApplier, BatchOperation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    OtherDevice,
    AlreadyInstalled,
    NotInstalled,
    NotInCatalog,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OtherDevice => "other-device",
            Self::AlreadyInstalled => "already-installed",
            Self::NotInstalled => "not-installed",
            Self::NotInCatalog => "not-in-catalog",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct ReconciliationPlan {
    pub to_install: Vec<PackageHandle>,
    pub to_remove: Vec<PackageHandle>,
    pub skipped: Vec<SkippedEntry>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.to_install.is_empty() && self.to_remove.is_empty()
    }

    pub fn install_names(&self) -> Vec<&str> {
        self.to_install.iter().map(PackageHandle::name).collect()
    }

    pub fn remove_names(&self) -> Vec<&str> {
        self.to_remove.iter().map(PackageHandle::name).collect()
    }

    fn skip(&mut self, name: &str, reason: SkipReason) {
        match reason {
            SkipReason::NotInCatalog => {
                warn!(skill = %name, "skipping skill not present in the catalog")
            }
            _ => debug!(skill = %name, reason = reason.as_str(), "skipping skill"),
        }
        self.skipped.push(SkippedEntry {
            name: name.to_string(),
            reason,
        });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub installed: BatchResult,
    pub removed: BatchResult,
    pub skipped: Vec<SkippedEntry>,
}

/// Receives batch progress. Both methods default to doing nothing.
pub trait SyncObserver: Sync {
    fn planned(&self, _plan: &ReconciliationPlan) {}

    fn item_finished(&self, _operation: BatchOperation, _name: &str, _outcome: &BatchOutcome) {}
}

pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

pub struct ReconciliationEngine<'a> {
    catalog: &'a PackageCatalog,
    applier: &'a BatchApplier,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(catalog: &'a PackageCatalog, applier: &'a BatchApplier) -> Self {
        Self { catalog, applier }
    }

    /// Fails only when the catalog cannot be enumerated.
    pub fn plan(
        &self,
        delta: &DesiredStateDelta,
        device_uuid: &str,
    ) -> SkillResult<ReconciliationPlan> {
        let scoped = delta.scoped(device_uuid);
        let mut plan = ReconciliationPlan::default();
        for name in scoped.out_of_scope {
            debug!(
                skill = %name,
                device = %device_uuid,
                "skipping entry scoped to other devices"
            );
            plan.skipped.push(SkippedEntry {
                name,
                reason: SkipReason::OtherDevice,
            });
        }

        let handles = self.catalog.list()?;
        let lookup = |name: &str| handles.iter().find(|handle| handle.name() == name);

        for name in &scoped.to_install {
            match lookup(name) {
                None => plan.skip(name, SkipReason::NotInCatalog),
                Some(handle) if handle.is_local() => plan.skip(name, SkipReason::AlreadyInstalled),
                Some(handle) => plan.to_install.push(handle.clone()),
            }
        }
        for name in &scoped.to_remove {
            match lookup(name) {
                None => plan.skip(name, SkipReason::NotInCatalog),
                Some(handle) if !handle.is_local() => plan.skip(name, SkipReason::NotInstalled),
                Some(handle) => plan.to_remove.push(handle.clone()),
            }
        }

        info!(
            install = plan.to_install.len(),
            remove = plan.to_remove.len(),
            skipped = plan.skipped.len(),
            "reconciliation planned"
        );
        Ok(plan)
    }

    pub fn apply(
        &self,
        plan: ReconciliationPlan,
        observer: &dyn SyncObserver,
    ) -> ReconciliationReport {
        observer.planned(&plan);
        let installed = self
            .applier
            .apply_with(BatchOperation::Install, &plan.to_install, &|name, outcome| {
                observer.item_finished(BatchOperation::Install, name, outcome)
            });
        let removed = self
            .applier
            .apply_with(BatchOperation::Remove, &plan.to_remove, &|name, outcome| {
                observer.item_finished(BatchOperation::Remove, name, outcome)
            });

        ReconciliationReport {
            installed,
            removed,
            skipped: plan.skipped,
        }
    }
}

/// Folds batch outcomes into `ledger`. Returns whether anything changed.
pub fn merge_outcomes(ledger: &mut Ledger, report: &ReconciliationReport, now: u64) -> bool {
    let mut changed = false;
    for (name, outcome) in &report.installed.items {
        let record = match outcome {
            BatchOutcome::Success => {
                InstallationRecord::installed(InstallOrigin::Marketplace, false, now)
            }
            BatchOutcome::Failure(reason) => {
                InstallationRecord::failed(InstallOrigin::Marketplace, false, reason.clone(), now)
            }
        };
        ledger.insert(name.clone(), record);
        changed = true;
    }

    for (name, outcome) in &report.removed.items {
        match outcome {
            BatchOutcome::Success => {
                changed |= ledger.remove(name).is_some();
            }
            BatchOutcome::Failure(reason) => {
                if let Some(record) = ledger.get_mut(name) {
                    record.last_failure_message = reason.clone();
                    record.last_updated_epoch = now;
                    changed = true;
                }
            }
        }
    }
    changed
}
