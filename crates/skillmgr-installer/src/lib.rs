mod batch;
mod config;
mod dialog;
mod identity;
mod layout;
mod ledger;
mod lock;
mod manager;
mod reconcile;
mod voice;

pub use batch::{BatchApplier, BatchOperation};
pub use config::{ManagerConfig, MAX_WORKERS, MIN_WORKERS};
pub use dialog::{
    is_affirmative, ChannelResponder, Notice, Notifier, Prompt, Responder, ResponderEndpoint,
    Response, SkillAction,
};
pub use identity::{DeviceIdentity, NoopUploader, StaticDeviceIdentity, TelemetryUploader};
pub use layout::{default_user_prefix, SkillsLayout};
pub use ledger::StateLedger;
pub use lock::InstallLock;
pub use manager::{Collaborators, SettingsChange, SkillManager};
pub use reconcile::{
    merge_outcomes, NoopObserver, ReconciliationEngine, ReconciliationPlan, ReconciliationReport,
    SkipReason, SkippedEntry, SyncObserver,
};
pub use voice::{VoiceCompletion, VoiceState};
