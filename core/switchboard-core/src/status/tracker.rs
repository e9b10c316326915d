//! Per-directory runtime status map.
//!
//! `StatusTracker` is the only writer of runtime status. Every assignment
//! refreshes the stored entry, but a `StatusChange` is returned only when the
//! value actually differs, so observers see "changed" and never "refreshed".

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::events::HookEvent;
use crate::paths::{normalize_directory, normalize_path_for_matching};

use super::transition::next_status;
use super::types::RuntimeStatus;

/// Why a status was assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCause {
    HookEvent,
    Reset,
    TerminalClosed,
    ManualOverride,
}

/// A status transition that actually changed the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub directory: String,
    pub previous: RuntimeStatus,
    pub current: RuntimeStatus,
    pub cause: StatusCause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub directory: String,
    pub status: RuntimeStatus,
    /// Last time any assignment touched this entry.
    pub updated_at: DateTime<Utc>,
    /// Last time the value changed.
    pub changed_at: DateTime<Utc>,
}

/// Read-only view of every tracked session's status, keyed by session directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub statuses: BTreeMap<String, RuntimeStatus>,
}

impl StatusSnapshot {
    pub fn status(&self, directory: &str) -> RuntimeStatus {
        self.statuses.get(directory).copied().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct StatusTracker {
    entries: HashMap<String, StatusEntry>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status of `directory`; directories never observed are idle.
    pub fn status(&self, directory: &str) -> RuntimeStatus {
        self.entry(directory)
            .map(|e| e.status)
            .unwrap_or_default()
    }

    pub fn entry(&self, directory: &str) -> Option<&StatusEntry> {
        self.entries.get(&normalize_path_for_matching(directory))
    }

    /// Applies a hook event to the directory it was reported from.
    pub fn apply(&mut self, event: &HookEvent) -> Option<StatusChange> {
        let prior = self.status(&event.cwd);
        let next = next_status(prior, event);
        self.assign(&event.cwd, next, StatusCause::HookEvent)
    }

    /// The user re-engaged a finished session: `complete -> idle`, otherwise a no-op.
    pub fn reset(&mut self, directory: &str) -> Option<StatusChange> {
        if self.status(directory) != RuntimeStatus::Complete {
            return None;
        }
        self.assign(directory, RuntimeStatus::Idle, StatusCause::Reset)
    }

    /// The session's terminal was closed.
    pub fn terminal_closed(&mut self, directory: &str) -> Option<StatusChange> {
        self.assign(directory, RuntimeStatus::Idle, StatusCause::TerminalClosed)
    }

    /// Unconditional override from the user.
    pub fn force_idle(&mut self, directory: &str) -> Option<StatusChange> {
        self.assign(directory, RuntimeStatus::Idle, StatusCause::ManualOverride)
    }

    /// Forgets a directory (its session was removed).
    pub fn forget(&mut self, directory: &str) {
        self.entries.remove(&normalize_path_for_matching(directory));
    }

    /// Builds a snapshot covering exactly `directories`.
    pub fn snapshot<'a>(&self, directories: impl IntoIterator<Item = &'a str>) -> StatusSnapshot {
        StatusSnapshot {
            statuses: directories
                .into_iter()
                .map(|dir| (dir.to_string(), self.status(dir)))
                .collect(),
        }
    }

    fn assign(
        &mut self,
        directory: &str,
        status: RuntimeStatus,
        cause: StatusCause,
    ) -> Option<StatusChange> {
        let now = Utc::now();
        let key = normalize_path_for_matching(directory);
        let directory = normalize_directory(directory);

        let previous = self.entries.get(&key).map(|e| e.status).unwrap_or_default();
        let changed_at = match self.entries.get(&key) {
            Some(entry) if entry.status == status => entry.changed_at,
            _ => now,
        };

        self.entries.insert(
            key,
            StatusEntry {
                directory: directory.clone(),
                status,
                updated_at: now,
                changed_at,
            },
        );

        if previous == status {
            tracing::trace!(directory = %directory, status = %status, "Status refreshed");
            return None;
        }

        tracing::info!(
            directory = %directory,
            from = %previous,
            to = %status,
            cause = ?cause,
            "Status changed"
        );
        Some(StatusChange {
            directory,
            previous,
            current: status,
            cause,
        })
    }
}
