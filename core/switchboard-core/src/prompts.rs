//! User-facing prompts for sessions that need attention.
//!
//! Prompting is a two-phase protocol: a transition into `stuck` or `complete`
//! issues a prompt and hands the presenter a [`PromptToken`]; some time later
//! the host calls [`PromptCoordinator::resolve_prompt`] with the user's choice.
//! Nothing blocks in between.
//!
//! A prompt is dismissed when its directory changes status again, or when the
//! user brings that session's terminal to front. A dismissed prompt still
//! resolves, but its action is discarded.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::bus::{ObserverBus, SubscriberId};
use crate::paths::normalize_path_for_matching;
use crate::status::{RuntimeStatus, StatusChange};

/// Dismissed prompts kept around so late responses are recognized as stale.
const MAX_DISMISSED: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PromptToken(u64);

impl std::fmt::Display for PromptToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl FromStr for PromptToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .trim_start_matches('p')
            .parse::<u64>()
            .map(PromptToken)
            .map_err(|_| format!("invalid prompt token: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAction {
    OpenTerminal,
    ShowChanges,
    Dismiss,
}

impl FromStr for PromptAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "open" | "open-terminal" => Ok(PromptAction::OpenTerminal),
            "changes" | "show-changes" => Ok(PromptAction::ShowChanges),
            "dismiss" => Ok(PromptAction::Dismiss),
            other => Err(format!("unknown prompt action: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub token: PromptToken,
    pub directory: String,
    pub status: RuntimeStatus,
    pub message: String,
    /// Actions the host should offer, in display order.
    pub actions: Vec<PromptAction>,
}

/// A response that is still live and should be executed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptResolution {
    pub token: PromptToken,
    pub directory: String,
    pub action: PromptAction,
}

/// Host side of the prompt protocol (toast, console line, notification).
pub trait PromptPresenter: Send {
    fn present(&mut self, request: &PromptRequest);

    /// The prompt went stale; hosts that can retract a toast should do so.
    fn withdraw(&mut self, _token: PromptToken) {}
}

#[derive(Debug)]
struct PendingPrompt {
    key: String,
    directory: String,
    dismissed: bool,
}

pub struct PromptCoordinator {
    next_token: u64,
    prompts: BTreeMap<PromptToken, PendingPrompt>,
    presenter: Box<dyn PromptPresenter>,
}

pub type SharedPrompts = Arc<Mutex<PromptCoordinator>>;

pub fn lock_prompts(prompts: &SharedPrompts) -> MutexGuard<'_, PromptCoordinator> {
    prompts.lock().unwrap_or_else(|p| p.into_inner())
}

impl PromptCoordinator {
    pub fn new(presenter: Box<dyn PromptPresenter>) -> Self {
        Self {
            next_token: 0,
            prompts: BTreeMap::new(),
            presenter,
        }
    }

    /// Wraps the coordinator for sharing and subscribes it to `bus`.
    pub fn attach(self, bus: &mut ObserverBus) -> (SharedPrompts, SubscriberId) {
        let shared = Arc::new(Mutex::new(self));
        let handle = Arc::clone(&shared);
        let id = bus.subscribe(move |change, _| {
            lock_prompts(&handle).on_status_change(change);
        });
        (shared, id)
    }

    /// Reacts to a real status change. Returns the token of a newly issued prompt.
    pub fn on_status_change(&mut self, change: &StatusChange) -> Option<PromptToken> {
        self.dismiss_directory(&change.directory, "status changed");

        if !change.current.needs_attention() || change.previous == change.current {
            return None;
        }
        Some(self.issue_prompt(&change.directory, change.current))
    }

    /// The user brought the session's terminal to front.
    pub fn terminal_focused(&mut self, directory: &str) {
        self.dismiss_directory(directory, "terminal brought to front");
    }

    pub fn issue_prompt(&mut self, directory: &str, status: RuntimeStatus) -> PromptToken {
        self.next_token += 1;
        let token = PromptToken(self.next_token);

        let label = Path::new(directory)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| directory.to_string());
        let message = match status {
            RuntimeStatus::Stuck => format!("{label} is waiting for permission"),
            _ => format!("{label} finished and is waiting for you"),
        };

        self.prompts.insert(
            token,
            PendingPrompt {
                key: normalize_path_for_matching(directory),
                directory: directory.to_string(),
                dismissed: false,
            },
        );

        let request = PromptRequest {
            token,
            directory: directory.to_string(),
            status,
            message,
            actions: vec![
                PromptAction::OpenTerminal,
                PromptAction::ShowChanges,
                PromptAction::Dismiss,
            ],
        };
        tracing::info!(token = %token, directory = %directory, status = %status, "Prompt issued");
        self.presenter.present(&request);
        token
    }

    /// Completes a prompt. Returns the action to execute, or `None` when the
    /// prompt was dismissed, declined, or never existed.
    pub fn resolve_prompt(
        &mut self,
        token: PromptToken,
        action: PromptAction,
    ) -> Option<PromptResolution> {
        let Some(prompt) = self.prompts.remove(&token) else {
            tracing::warn!(token = %token, "Response for unknown prompt ignored");
            return None;
        };

        if prompt.dismissed {
            tracing::info!(
                token = %token,
                directory = %prompt.directory,
                action = ?action,
                "Prompt was dismissed; discarding response"
            );
            return None;
        }

        if action == PromptAction::Dismiss {
            tracing::debug!(token = %token, "Prompt declined");
            return None;
        }

        Some(PromptResolution {
            token,
            directory: prompt.directory,
            action,
        })
    }

    /// Live (not dismissed) prompts for `directory`.
    pub fn pending_for(&self, directory: &str) -> Vec<PromptToken> {
        let key = normalize_path_for_matching(directory);
        self.prompts
            .iter()
            .filter(|(_, p)| !p.dismissed && p.key == key)
            .map(|(t, _)| *t)
            .collect()
    }

    pub fn is_dismissed(&self, token: PromptToken) -> bool {
        self.prompts.get(&token).is_some_and(|p| p.dismissed)
    }

    fn dismiss_directory(&mut self, directory: &str, reason: &str) {
        let key = normalize_path_for_matching(directory);
        let mut withdrawn = Vec::new();
        for (token, prompt) in self.prompts.iter_mut() {
            if prompt.key == key && !prompt.dismissed {
                prompt.dismissed = true;
                withdrawn.push(*token);
            }
        }

        for token in withdrawn {
            tracing::debug!(token = %token, directory = %directory, reason, "Prompt dismissed");
            self.presenter.withdraw(token);
        }
        self.prune_dismissed();
    }

    fn prune_dismissed(&mut self) {
        let dismissed: Vec<PromptToken> = self
            .prompts
            .iter()
            .filter(|(_, p)| p.dismissed)
            .map(|(t, _)| *t)
            .collect();
        if dismissed.len() <= MAX_DISMISSED {
            return;
        }
        // Tokens are monotonic, so the front of the list is the oldest.
        for token in &dismissed[..dismissed.len() - MAX_DISMISSED] {
            self.prompts.remove(token);
        }
    }
}

impl std::fmt::Debug for PromptCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptCoordinator")
            .field("prompts", &self.prompts)
            .finish()
    }
}

/// Presenter that records requests; used by tests and headless hosts.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    pub presented: Arc<Mutex<Vec<PromptRequest>>>,
    pub withdrawn: Arc<Mutex<Vec<PromptToken>>>,
}

impl PromptPresenter for RecordingPresenter {
    fn present(&mut self, request: &PromptRequest) {
        self.presented
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request.clone());
    }

    fn withdraw(&mut self, token: PromptToken) {
        self.withdrawn
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(token);
    }
}
