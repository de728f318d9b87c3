use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::{Context, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use skillmgr_core::{BatchOutcome, BatchResult, SkillError, SkillResult, TransportStage};
use skillmgr_registry::PackageHandle;
use tracing::debug;

use crate::config::{MAX_WORKERS, MIN_WORKERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOperation {
    Install,
    Update,
    Reinstall,
    Remove,
}

impl BatchOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Reinstall => "reinstall",
            Self::Remove => "remove",
        }
    }

    fn panic_stage(&self) -> TransportStage {
        match self {
            Self::Install | Self::Reinstall => TransportStage::Clone,
            Self::Update => TransportStage::Pull,
            Self::Remove => TransportStage::Erase,
        }
    }

    fn run(&self, handle: &PackageHandle) -> SkillResult<()> {
        match self {
            Self::Install => handle.fetch(),
            Self::Update => handle.update(),
            Self::Reinstall => {
                handle.erase()?;
                handle.fetch()
            }
            Self::Remove => handle.erase(),
        }
    }
}

/// Runs one operation per handle on a bounded worker pool. Item failures,
/// panics included, are reported per name and never abort the batch.
pub struct BatchApplier {
    pool: ThreadPool,
    worker_count: usize,
}

impl BatchApplier {
    pub fn new(worker_count: usize) -> Result<Self> {
        let worker_count = worker_count.clamp(MIN_WORKERS, MAX_WORKERS);
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|index| format!("skillmgr-worker-{index}"))
            .build()
            .context("failed building batch worker pool")?;
        Ok(Self { pool, worker_count })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn apply(&self, operation: BatchOperation, handles: &[PackageHandle]) -> BatchResult {
        self.apply_with(operation, handles, &|_, _| {})
    }

    /// `on_item` is called from worker threads as each item finishes.
    pub fn apply_with(
        &self,
        operation: BatchOperation,
        handles: &[PackageHandle],
        on_item: &(dyn Fn(&str, &BatchOutcome) + Sync),
    ) -> BatchResult {
        let items = self.pool.install(|| {
            handles
                .par_iter()
                .map(|handle| {
                    let outcome = BatchOutcome::from_result(&Self::apply_one(operation, handle));
                    on_item(handle.name(), &outcome);
                    (handle.name().to_string(), outcome)
                })
                .collect::<Vec<_>>()
        });

        let mut result = BatchResult::default();
        for (name, outcome) in items {
            result.push(name, outcome);
        }
        result
    }

    /// Same contract as [`BatchApplier::apply`] for a single handle, run on
    /// the calling thread.
    pub fn apply_one(operation: BatchOperation, handle: &PackageHandle) -> SkillResult<()> {
        let result = match catch_unwind(AssertUnwindSafe(|| operation.run(handle))) {
            Ok(result) => result,
            Err(payload) => Err(SkillError::transport(
                operation.panic_stage(),
                format!("{} worker panicked: {}", operation.as_str(), panic_message(&*payload)),
            )),
        };
        debug!(
            skill = %handle.name(),
            operation = operation.as_str(),
            ok = result.is_ok(),
            "batch item finished"
        );
        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}
