//! The single driver that owns every piece of engine state.
//!
//! ```text
//! NotifyEventSource ─┐
//!   host commands  ──┼─► mpsc ─► Supervisor::run ─► IngestionWatcher ─► StatusTracker ─► ObserverBus
//!                    │                 │                                                  ├─► SummaryView
//!                    │                 │                                                  └─► PromptCoordinator
//!                    │                 ├─► FocusArbiter / ChangeSetAggregator (on demand)
//!                    │                 └─► HostActions (open terminal, show changes)
//! ```
//!
//! Everything runs on the thread that calls [`Supervisor::run`]. Each message
//! is handled to completion before the next is received, so a directory's
//! status read-modify-write never interleaves with another event.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Instant;

use crate::bus::{ObserverBus, StatusSummary, SummaryView};
use crate::changes::{ChangeSetAggregator, ChangedFile, StatusQuery};
use crate::config::SupervisorConfig;
use crate::error::{Result, SwitchboardError};
use crate::events::{HookEvent, IngestionStats, IngestionWatcher, WatcherConfig};
use crate::focus::{FocusArbiter, FocusOutcome, FocusState, UnfocusOutcome, WorkspaceFolders};
use crate::prompts::{
    lock_prompts, PromptAction, PromptCoordinator, PromptPresenter, PromptResolution, PromptToken,
    SharedPrompts,
};
use crate::sessions::{Session, SessionRegistry};
use crate::status::{RuntimeStatus, StatusChange, StatusSnapshot, StatusTracker};
use crate::store::SharedStore;

/// Host-side effects the engine asks for after a live prompt resolves.
pub trait HostActions: Send {
    fn open_terminal(&mut self, session: &Session);

    fn show_changes(&mut self, session: &Session, files: &[ChangedFile]);

    fn command_completed(&mut self, outcome: &CommandOutcome) {
        tracing::debug!(outcome = ?outcome, "Command completed");
    }

    fn command_failed(&mut self, error: &SwitchboardError) {
        tracing::warn!(error = %error, "Command failed");
    }
}

/// Commands the host can send (the CLI console, a UI, tests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorCommand {
    AddSession { directory: String, name: Option<String> },
    RemoveSession { id: String },
    FocusWorkspace { id: String },
    UnfocusWorkspace,
    /// User re-engaged the session: `complete -> idle`.
    ResetStatus { id: String },
    /// Unconditional override to `idle`.
    SetStatusIdle { id: String },
    TerminalClosed { id: String },
    TerminalFocused { id: String },
    RespondPrompt { token: PromptToken, action: PromptAction },
    ShowChanges { id: String },
    Summary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorMessage {
    FileReady(PathBuf),
    Command(SupervisorCommand),
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum CommandOutcome {
    SessionAdded(Session),
    SessionRemoved(Session),
    Focused(FocusOutcome),
    Unfocused(UnfocusOutcome),
    /// `None` when the status did not change.
    Status(Option<StatusChange>),
    /// `None` when the prompt was stale, declined, or unknown.
    PromptResolved(Option<PromptResolution>),
    Changes(Arc<Vec<ChangedFile>>),
    Summary(StatusSummary),
}

/// Collaborators the supervisor is assembled from.
pub struct SupervisorParts {
    pub config: SupervisorConfig,
    pub events_dir: PathBuf,
    pub store: SharedStore,
    pub folders: Box<dyn WorkspaceFolders>,
    pub query: Box<dyn StatusQuery>,
    pub presenter: Box<dyn PromptPresenter>,
    pub host: Box<dyn HostActions>,
}

pub struct Supervisor {
    watcher: IngestionWatcher,
    tracker: StatusTracker,
    bus: ObserverBus,
    summary: SummaryView,
    prompts: SharedPrompts,
    changes: ChangeSetAggregator,
    focus: FocusArbiter,
    sessions: SessionRegistry,
    host: Box<dyn HostActions>,
}

impl Supervisor {
    pub fn new(parts: SupervisorParts) -> Self {
        let SupervisorParts {
            config,
            events_dir,
            store,
            folders,
            query,
            presenter,
            host,
        } = parts;

        let mut bus = ObserverBus::new();
        let summary = SummaryView::attach(&mut bus);
        let (prompts, _) = PromptCoordinator::new(presenter).attach(&mut bus);

        let supervisor = Self {
            watcher: IngestionWatcher::new(WatcherConfig::from_supervisor(events_dir, &config)),
            tracker: StatusTracker::new(),
            bus,
            summary,
            prompts,
            changes: ChangeSetAggregator::new(query, config.change_cache_ttl()),
            focus: FocusArbiter::load(folders, store.clone()),
            sessions: SessionRegistry::load(store),
            host,
        };
        supervisor.summary.refresh(&supervisor.snapshot());
        supervisor
    }

    /// Replays the backlog. Returns the number of events applied.
    pub fn start(&mut self, now: Instant) -> usize {
        let deliveries = self.watcher.replay_backlog(now);
        let count = deliveries.len();
        for delivery in deliveries {
            self.apply(&delivery.event);
        }
        tracing::info!(
            replayed = count,
            sessions = self.sessions.list().len(),
            "Supervisor started"
        );
        count
    }

    /// Push interface for the event source.
    pub fn on_file_ready(&mut self, path: PathBuf, now: Instant) -> bool {
        self.watcher.on_file_ready(path, now)
    }

    /// Runs every watcher read and cleanup due at `now`. Returns the number of events applied.
    pub fn tick(&mut self, now: Instant) -> usize {
        let deliveries = self.watcher.poll(now);
        let count = deliveries.len();
        for delivery in deliveries {
            self.apply(&delivery.event);
        }
        count
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.watcher.next_deadline()
    }

    /// Feeds one event through the state machine. Changes for directories
    /// without a session are tracked but not published.
    pub fn apply(&mut self, event: &HookEvent) -> Option<StatusChange> {
        let change = self.tracker.apply(event)?;
        self.publish(&change);
        Some(change)
    }

    pub fn handle_command(
        &mut self,
        command: SupervisorCommand,
        now: Instant,
    ) -> Result<CommandOutcome> {
        // The one-shot CLI may have changed sessions since the last command.
        self.sessions.reload();
        match command {
            SupervisorCommand::AddSession { directory, name } => {
                let session = self.sessions.add(&directory, name.as_deref())?;
                self.summary.refresh(&self.snapshot());
                Ok(CommandOutcome::SessionAdded(session))
            }
            SupervisorCommand::RemoveSession { id } => {
                let removed = self.sessions.remove(&id)?;
                if let Err(e) = self.focus.on_session_removed(&id) {
                    tracing::warn!(session = %id, error = %e, "Removed session could not be unfocused");
                }
                self.changes.forget(&id);
                self.tracker.forget(&removed.directory);
                lock_prompts(&self.prompts).terminal_focused(&removed.directory);
                self.summary.refresh(&self.snapshot());
                Ok(CommandOutcome::SessionRemoved(removed))
            }
            SupervisorCommand::FocusWorkspace { id } => {
                let session = self.sessions.require(&id)?.clone();
                self.focus.focus(&session).map(CommandOutcome::Focused)
            }
            SupervisorCommand::UnfocusWorkspace => {
                self.focus.unfocus().map(CommandOutcome::Unfocused)
            }
            SupervisorCommand::ResetStatus { id } => {
                let directory = self.sessions.require(&id)?.directory.clone();
                Ok(CommandOutcome::Status(self.reset(&directory)))
            }
            SupervisorCommand::SetStatusIdle { id } => {
                let directory = self.sessions.require(&id)?.directory.clone();
                let change = self.tracker.force_idle(&directory);
                self.publish_opt(&change);
                Ok(CommandOutcome::Status(change))
            }
            SupervisorCommand::TerminalClosed { id } => {
                let directory = self.sessions.require(&id)?.directory.clone();
                let change = self.tracker.terminal_closed(&directory);
                self.publish_opt(&change);
                Ok(CommandOutcome::Status(change))
            }
            SupervisorCommand::TerminalFocused { id } => {
                let directory = self.sessions.require(&id)?.directory.clone();
                lock_prompts(&self.prompts).terminal_focused(&directory);
                Ok(CommandOutcome::Status(self.reset(&directory)))
            }
            SupervisorCommand::RespondPrompt { token, action } => {
                let resolution = lock_prompts(&self.prompts).resolve_prompt(token, action);
                if let Some(resolution) = &resolution {
                    self.execute(resolution, now);
                }
                Ok(CommandOutcome::PromptResolved(resolution))
            }
            SupervisorCommand::ShowChanges { id } => {
                let session = self.sessions.require(&id)?.clone();
                Ok(CommandOutcome::Changes(
                    self.changes.changed_files_at(&session, now),
                ))
            }
            SupervisorCommand::Summary => Ok(CommandOutcome::Summary(self.summary.current())),
        }
    }

    /// Drives the supervisor until `Shutdown` arrives or every sender is dropped.
    pub fn run(mut self, rx: Receiver<SupervisorMessage>) {
        self.start(Instant::now());

        loop {
            let now = Instant::now();
            self.tick(now);

            let received = match self.watcher.next_deadline() {
                Some(deadline) => match rx.recv_timeout(deadline.saturating_duration_since(now)) {
                    Ok(message) => Some(message),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match rx.recv() {
                    Ok(message) => Some(message),
                    Err(_) => break,
                },
            };

            match received {
                None => continue,
                Some(SupervisorMessage::FileReady(path)) => {
                    self.on_file_ready(path, Instant::now());
                }
                Some(SupervisorMessage::Command(command)) => self.dispatch(command),
                Some(SupervisorMessage::Shutdown) => break,
            }
        }

        let stats = self.watcher.stats();
        tracing::info!(
            delivered = stats.delivered,
            malformed = stats.malformed,
            duplicates = stats.duplicates_ignored,
            "Supervisor stopped"
        );
    }

    pub fn status(&self, directory: &str) -> RuntimeStatus {
        self.tracker.status(directory)
    }

    /// Statuses of every registered session, keyed by session directory.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.tracker
            .snapshot(self.sessions.list().iter().map(|s| s.directory.as_str()))
    }

    pub fn summary(&self) -> StatusSummary {
        self.summary.current()
    }

    pub fn sessions(&self) -> &[Session] {
        self.sessions.list()
    }

    pub fn focus_state(&self) -> &FocusState {
        self.focus.state()
    }

    pub fn prompts(&self) -> &SharedPrompts {
        &self.prompts
    }

    pub fn ingestion_stats(&self) -> &IngestionStats {
        self.watcher.stats()
    }

    /// Subscribes an extra observer to status changes.
    pub fn bus_mut(&mut self) -> &mut ObserverBus {
        &mut self.bus
    }

    fn dispatch(&mut self, command: SupervisorCommand) {
        match self.handle_command(command, Instant::now()) {
            Ok(outcome) => self.host.command_completed(&outcome),
            Err(e) => self.host.command_failed(&e),
        }
    }

    fn reset(&mut self, directory: &str) -> Option<StatusChange> {
        let change = self.tracker.reset(directory);
        self.publish_opt(&change);
        change
    }

    fn execute(&mut self, resolution: &PromptResolution, now: Instant) {
        let Some(session) = self.sessions.find_by_directory(&resolution.directory).cloned() else {
            tracing::info!(directory = %resolution.directory, "Session gone; ignoring prompt response");
            return;
        };

        match resolution.action {
            PromptAction::OpenTerminal => {
                self.host.open_terminal(&session);
                lock_prompts(&self.prompts).terminal_focused(&session.directory);
                self.reset(&session.directory);
            }
            PromptAction::ShowChanges => {
                let files = self.changes.changed_files_at(&session, now);
                self.host.show_changes(&session, &files);
            }
            PromptAction::Dismiss => {}
        }
    }

    fn publish_opt(&mut self, change: &Option<StatusChange>) {
        if let Some(change) = change {
            self.publish(change);
        }
    }

    fn publish(&mut self, change: &StatusChange) {
        if self.sessions.find_by_directory(&change.directory).is_none() {
            self.sessions.reload();
        }
        if self.sessions.find_by_directory(&change.directory).is_none() {
            tracing::debug!(directory = %change.directory, "Status change for untracked directory");
            return;
        }
        let snapshot = self.snapshot();
        self.bus.publish(change, &snapshot);
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("sessions", &self.sessions.list().len())
            .field("focus", self.focus.state())
            .field("stats", self.watcher.stats())
            .finish()
    }
}

/// Host that only logs; used when nothing can open terminals.
#[derive(Debug, Default)]
pub struct LoggingHost;

impl HostActions for LoggingHost {
    fn open_terminal(&mut self, session: &Session) {
        tracing::info!(session = %session.id, directory = %session.directory, "Open terminal requested");
    }

    fn show_changes(&mut self, session: &Session, files: &[ChangedFile]) {
        tracing::info!(session = %session.id, files = files.len(), "Show changes requested");
    }
}
