use rand::seq::SliceRandom;
use skillmgr_core::{
    extract_repo_name, validate_skill_name, InstallOrigin, InstallationRecord, InstallationStatus,
    Ledger, Locality, PackageIdentity, RevisionSelector, SkillError, SkillResult,
};
use skillmgr_registry::PackageHandle;
use tracing::{debug, warn};

use crate::manager::{now_epoch, state_unavailable};
use crate::{
    is_affirmative, BatchApplier, BatchOperation, Notice, Prompt, SkillAction, SkillManager,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Resolving,
    Confirming,
    Executing,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceCompletion {
    pub name: String,
    pub action: SkillAction,
}

struct VoiceSession<'a> {
    manager: &'a SkillManager,
    intent: &'static str,
    state: VoiceState,
}

impl<'a> VoiceSession<'a> {
    fn start(manager: &'a SkillManager, intent: &'static str) -> Self {
        Self {
            manager,
            intent,
            state: VoiceState::Idle,
        }
    }

    fn advance(&mut self, next: VoiceState) {
        debug!(intent = self.intent, from = ?self.state, to = ?next, "voice state");
        self.state = next;
    }

    /// Emits exactly one notice for the whole interaction.
    fn finish(
        mut self,
        query: &str,
        result: SkillResult<VoiceCompletion>,
    ) -> SkillResult<VoiceCompletion> {
        let notice = match &result {
            Ok(completion) => {
                self.advance(VoiceState::Completed);
                Notice::Completed {
                    name: completion.name.clone(),
                    action: completion.action,
                }
            }
            Err(SkillError::Cancelled) => {
                self.advance(VoiceState::Cancelled);
                Notice::Cancelled
            }
            Err(err) => {
                self.advance(VoiceState::Failed);
                warn!(intent = self.intent, query = %query, error = %err, "voice request failed");
                Notice::Failed {
                    kind: err.notice_kind(),
                    name: Some(err.subject().unwrap_or(query).to_string()),
                }
            }
        };
        self.manager.notifier.notify(notice);
        result
    }
}

impl SkillManager {
    /// An install request without a skill name lists what is available.
    pub fn install_intent(&self, query: Option<&str>) -> SkillResult<Option<VoiceCompletion>> {
        match query.map(str::trim).filter(|query| !query.is_empty()) {
            Some(query) => self.install(query).map(Some),
            None => self.available_skills().map(|_| None),
        }
    }

    pub fn install(&self, query: &str) -> SkillResult<VoiceCompletion> {
        let mut session = VoiceSession::start(self, "install");
        let result = self.run_install(&mut session, query);
        session.finish(query, result)
    }

    pub fn install_pre_release(&self, query: &str) -> SkillResult<VoiceCompletion> {
        let mut session = VoiceSession::start(self, "install-pre-release");
        let result = self.run_install_pre_release(&mut session, query);
        session.finish(query, result)
    }

    pub fn remove(&self, query: &str) -> SkillResult<VoiceCompletion> {
        let mut session = VoiceSession::start(self, "remove");
        let result = self.run_remove(&mut session, query);
        session.finish(query, result)
    }

    pub fn install_from_link(&self, url: &str) -> SkillResult<VoiceCompletion> {
        let mut session = VoiceSession::start(self, "install-link");
        let result = self.run_install_from_link(&mut session, url);
        session.finish(url, result)
    }

    /// Up to `available_skills_limit` random skills that are not installed.
    pub fn available_skills(&self) -> SkillResult<Vec<String>> {
        let handles = match self.catalog.list() {
            Ok(handles) => handles,
            Err(err) => {
                self.notifier.notify(Notice::Failed {
                    kind: err.notice_kind(),
                    name: None,
                });
                return Err(err);
            }
        };

        let mut names = handles
            .iter()
            .filter(|handle| !handle.is_local())
            .map(|handle| handle.name().to_string())
            .collect::<Vec<_>>();
        names.shuffle(&mut rand::rng());
        names.truncate(self.config.available_skills_limit);

        self.notifier.notify(Notice::AvailableSkills(names.clone()));
        Ok(names)
    }

    fn run_install(
        &self,
        session: &mut VoiceSession<'_>,
        query: &str,
    ) -> SkillResult<VoiceCompletion> {
        session.advance(VoiceState::Resolving);
        let handle = self
            .resolve_interactive(query, Locality::RemoteOnly)?
            .with_selector(Some(RevisionSelector::Stable));
        let name = handle.name().to_string();
        let reinstall = self.stable_install_is_reinstall(&handle)?;

        session.advance(VoiceState::Confirming);
        self.confirm(&Prompt::ConfirmInstall {
            name: name.clone(),
            reinstall,
        })?;

        session.advance(VoiceState::Executing);
        let lock = self.acquire_lock()?;
        let operation = if self.stable_install_is_reinstall(&handle)? {
            BatchOperation::Reinstall
        } else {
            BatchOperation::Install
        };
        let result = BatchApplier::apply_one(operation, &handle);
        let recorded = self.record_install(&name, false, &result);
        drop(lock);

        self.finish_execution(result, recorded)?;
        Ok(VoiceCompletion {
            name,
            action: SkillAction::Installed,
        })
    }

    fn run_install_pre_release(
        &self,
        session: &mut VoiceSession<'_>,
        query: &str,
    ) -> SkillResult<VoiceCompletion> {
        session.advance(VoiceState::Resolving);
        let handle = self
            .resolve_interactive(query, Locality::RemoteOnly)?
            .with_selector(None);
        let name = handle.name().to_string();
        let upgrade = self.pre_release_is_upgrade(&handle)?;

        session.advance(VoiceState::Confirming);
        self.confirm(&Prompt::ConfirmPreRelease {
            name: name.clone(),
            upgrade,
        })?;

        session.advance(VoiceState::Executing);
        let lock = self.acquire_lock()?;
        let operation = if self.pre_release_is_upgrade(&handle)? {
            BatchOperation::Update
        } else {
            BatchOperation::Install
        };
        let result = BatchApplier::apply_one(operation, &handle);
        let recorded = match (&result, operation) {
            (Err(err), BatchOperation::Update) => self.record_failure(&name, err),
            _ => self.record_install(&name, true, &result),
        };
        drop(lock);

        self.finish_execution(result, recorded)?;
        Ok(VoiceCompletion {
            name,
            action: SkillAction::InstalledPreRelease,
        })
    }

    fn run_remove(
        &self,
        session: &mut VoiceSession<'_>,
        query: &str,
    ) -> SkillResult<VoiceCompletion> {
        session.advance(VoiceState::Resolving);
        let handle = self.resolve_interactive(query, Locality::LocalOnly)?;
        let name = handle.name().to_string();
        if !handle.is_local() {
            return Err(SkillError::AlreadyRemoved(name));
        }

        session.advance(VoiceState::Confirming);
        self.confirm(&Prompt::ConfirmRemove { name: name.clone() })?;

        session.advance(VoiceState::Executing);
        let lock = self.acquire_lock()?;
        if !handle.is_local() {
            return Err(SkillError::AlreadyRemoved(name));
        }
        let result = BatchApplier::apply_one(BatchOperation::Remove, &handle);
        let recorded = match &result {
            Ok(()) => self
                .ledger
                .merge(&name, |_| None)
                .map_err(state_unavailable),
            Err(err) => self.record_failure(&name, err),
        };
        drop(lock);

        self.finish_execution(result, recorded)?;
        Ok(VoiceCompletion {
            name,
            action: SkillAction::Removed,
        })
    }

    fn run_install_from_link(
        &self,
        session: &mut VoiceSession<'_>,
        url: &str,
    ) -> SkillResult<VoiceCompletion> {
        session.advance(VoiceState::Resolving);
        let url = url.trim();
        let name = extract_repo_name(url)
            .filter(|name| validate_skill_name(name).is_ok())
            .ok_or_else(|| SkillError::NotFound(url.to_string()))?;
        let handle = self
            .catalog
            .handle_for(PackageIdentity::new(name.clone(), "").with_url(url));
        if handle.is_local() {
            return Err(SkillError::AlreadyInstalled(name));
        }

        session.advance(VoiceState::Executing);
        let lock = self.acquire_lock()?;
        if handle.is_local() {
            return Err(SkillError::AlreadyInstalled(name));
        }
        let result = BatchApplier::apply_one(BatchOperation::Install, &handle);
        let recorded = self.record_install(&name, false, &result);
        drop(lock);

        self.finish_execution(result, recorded)?;
        Ok(VoiceCompletion {
            name,
            action: SkillAction::Installed,
        })
    }

    /// Resolves `query`, asking the user once to choose when several skills
    /// match after the locality filter.
    fn resolve_interactive(&self, query: &str, locality: Locality) -> SkillResult<PackageHandle> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SkillError::NotFound(query.to_string()));
        }

        let candidates = match self.catalog.resolve_with_locality(query, Some(locality)) {
            Err(SkillError::Ambiguous(candidates)) => candidates,
            other => return other,
        };

        self.notifier
            .notify(Notice::AmbiguousPrompt(candidates.clone()));
        let response = self.responder.request(
            &Prompt::ChooseSkill {
                candidates: candidates.clone(),
            },
            self.config.confirmation_timeout(),
        );
        let Some(choice) = response.text() else {
            return Err(SkillError::Cancelled);
        };

        match self.catalog.resolve_among(choice, &candidates) {
            Err(SkillError::Ambiguous(_) | SkillError::NotFound(_)) => {
                Err(SkillError::NotFound(query.to_string()))
            }
            other => other,
        }
    }

    fn confirm(&self, prompt: &Prompt) -> SkillResult<()> {
        let response = self
            .responder
            .request(prompt, self.config.confirmation_timeout());
        if is_affirmative(&response, &self.config.affirmative_words) {
            return Ok(());
        }
        Err(SkillError::Cancelled)
    }

    fn recorded_pre_release(&self, name: &str) -> bool {
        self.ledger
            .load_or_recover()
            .get(name)
            .is_some_and(|record| {
                record.is_pre_release && record.installation_status == InstallationStatus::Installed
            })
    }

    /// A stable install over a local pre-release replaces it; over a local
    /// stable install it is refused.
    fn stable_install_is_reinstall(&self, handle: &PackageHandle) -> SkillResult<bool> {
        if !handle.is_local() {
            return Ok(false);
        }
        if self.recorded_pre_release(handle.name()) {
            return Ok(true);
        }
        Err(SkillError::AlreadyInstalled(handle.name().to_string()))
    }

    fn pre_release_is_upgrade(&self, handle: &PackageHandle) -> SkillResult<bool> {
        if !handle.is_local() {
            return Ok(false);
        }
        if self.recorded_pre_release(handle.name()) {
            return Err(SkillError::AlreadyPreRelease(handle.name().to_string()));
        }
        Ok(true)
    }

    fn record_install(
        &self,
        name: &str,
        is_pre_release: bool,
        result: &SkillResult<()>,
    ) -> SkillResult<Ledger> {
        let now = now_epoch();
        let record = match result {
            Ok(()) => InstallationRecord::installed(InstallOrigin::Voice, is_pre_release, now),
            Err(err) => {
                InstallationRecord::failed(InstallOrigin::Voice, is_pre_release, err.to_string(), now)
            }
        };
        self.ledger
            .merge(name, |_| Some(record))
            .map_err(state_unavailable)
    }

    /// Keeps the existing record of a skill whose tree is still in place and
    /// only notes the failure on it.
    fn record_failure(&self, name: &str, err: &SkillError) -> SkillResult<Ledger> {
        let message = err.to_string();
        let now = now_epoch();
        self.ledger
            .merge(name, move |current| {
                current.map(|mut record| {
                    record.last_failure_message = message;
                    record.last_updated_epoch = now;
                    record
                })
            })
            .map_err(state_unavailable)
    }

    /// The transport error wins over a ledger write error.
    fn finish_execution(
        &self,
        result: SkillResult<()>,
        recorded: SkillResult<Ledger>,
    ) -> SkillResult<()> {
        if let Ok(ledger) = &recorded {
            self.upload_snapshot(ledger);
        }
        result?;
        recorded.map(|_| ())
    }
}
