use std::collections::HashSet;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use skillmgr_core::NoticeKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    ConfirmInstall { name: String, reinstall: bool },
    ConfirmPreRelease { name: String, upgrade: bool },
    ConfirmRemove { name: String },
    ChooseSkill { candidates: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Reply(String),
    TimedOut,
}

impl Response {
    /// The reply text, or `None` for a timeout or a blank reply.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Reply(text) if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        }
    }
}

/// Asks the user something and waits at most `timeout` for the answer.
pub trait Responder: Send + Sync {
    fn request(&self, prompt: &Prompt, timeout: Duration) -> Response;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillAction {
    Installed,
    InstalledPreRelease,
    Removed,
}

impl SkillAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::InstalledPreRelease => "installed-pre-release",
            Self::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Completed { name: String, action: SkillAction },
    Cancelled,
    Failed { kind: NoticeKind, name: Option<String> },
    AmbiguousPrompt(Vec<String>),
    AvailableSkills(Vec<String>),
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Request/response over channels. The host owns the [`ResponderEndpoint`]
/// and answers prompts from whatever input it has.
#[derive(Debug)]
pub struct ChannelResponder {
    prompts: Sender<Prompt>,
    replies: Receiver<String>,
}

#[derive(Debug)]
pub struct ResponderEndpoint {
    pub prompts: Receiver<Prompt>,
    pub replies: Sender<String>,
}

impl ChannelResponder {
    pub fn new() -> (Self, ResponderEndpoint) {
        let (prompt_tx, prompt_rx) = unbounded();
        let (reply_tx, reply_rx) = unbounded();
        (
            Self {
                prompts: prompt_tx,
                replies: reply_rx,
            },
            ResponderEndpoint {
                prompts: prompt_rx,
                replies: reply_tx,
            },
        )
    }
}

impl Responder for ChannelResponder {
    fn request(&self, prompt: &Prompt, timeout: Duration) -> Response {
        // Replies that arrived after an earlier prompt timed out are stale.
        while self.replies.try_recv().is_ok() {}

        if self.prompts.send(prompt.clone()).is_err() {
            return Response::TimedOut;
        }
        match self.replies.recv_timeout(timeout) {
            Ok(reply) => Response::Reply(reply),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Response::TimedOut,
        }
    }
}

pub fn is_affirmative(response: &Response, affirmative_words: &[String]) -> bool {
    let Some(text) = response.text() else {
        return false;
    };
    let words: HashSet<String> = affirmative_words
        .iter()
        .map(|word| word.to_lowercase())
        .collect();
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|ch: char| !ch.is_alphanumeric())
                .to_lowercase()
        })
        .any(|word| words.contains(&word))
}
