//! Session records: one tracked working directory per Claude Code session.
//!
//! Sessions are created and destroyed only by explicit user action and are
//! never edited in place. At most one session exists per directory, compared
//! after normalization.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SwitchboardError};
use crate::paths::{normalize_directory, normalize_path_for_matching};
use crate::store::{lock, SharedStore};

const SESSIONS_KEY: &str = "sessions";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub directory: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn directory_path(&self) -> &Path {
        Path::new(&self.directory)
    }
}

pub struct SessionRegistry {
    sessions: Vec<Session>,
    store: SharedStore,
}

impl SessionRegistry {
    /// Loads sessions from the store. Unreadable records are dropped with a warning.
    pub fn load(store: SharedStore) -> Self {
        let sessions = read_sessions(&store).unwrap_or_default();
        Self { sessions, store }
    }

    /// Picks up sessions another process added or removed. An unreadable
    /// record keeps the current list.
    pub fn reload(&mut self) {
        if let Some(sessions) = read_sessions(&self.store) {
            self.sessions = sessions;
        }
    }

    /// Registers a new session for `directory`.
    pub fn add(&mut self, directory: &str, name: Option<&str>) -> Result<Session> {
        self.reload();
        let directory = normalize_directory(directory);
        let path = Path::new(&directory);

        if !path.is_dir() {
            return Err(SwitchboardError::InvalidSessionDirectory {
                path: directory.clone(),
                reason: "not an existing directory".to_string(),
            });
        }

        if let Some(existing) = self.find_by_directory(&directory) {
            return Err(SwitchboardError::DuplicateSessionDirectory {
                directory,
                existing_id: existing.id.clone(),
            });
        }

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| directory.clone());

        let session = Session {
            id: ulid::Ulid::new().to_string(),
            name,
            directory,
            created_at: Utc::now(),
        };

        let mut sessions = self.sessions.clone();
        sessions.push(session.clone());
        self.commit(sessions)?;
        tracing::info!(session = %session.id, directory = %session.directory, "Session added");
        Ok(session)
    }

    pub fn remove(&mut self, id: &str) -> Result<Session> {
        self.reload();
        let index = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| SwitchboardError::SessionNotFound(id.to_string()))?;

        let mut sessions = self.sessions.clone();
        let removed = sessions.remove(index);
        self.commit(sessions)?;
        tracing::info!(session = %removed.id, directory = %removed.directory, "Session removed");
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn require(&self, id: &str) -> Result<&Session> {
        self.get(id)
            .ok_or_else(|| SwitchboardError::SessionNotFound(id.to_string()))
    }

    pub fn find_by_directory(&self, directory: &str) -> Option<&Session> {
        let key = normalize_path_for_matching(directory);
        self.sessions
            .iter()
            .find(|s| normalize_path_for_matching(&s.directory) == key)
    }

    /// Sessions ordered by creation time.
    pub fn list(&self) -> &[Session] {
        &self.sessions
    }

    /// Persists `sessions`, then adopts them. A failed write changes nothing.
    fn commit(&mut self, sessions: Vec<Session>) -> Result<()> {
        let value = serde_json::to_value(&sessions)
            .map_err(|e| SwitchboardError::json("serializing sessions", e))?;
        lock(&self.store).put(SESSIONS_KEY, value)?;
        self.sessions = sessions;
        Ok(())
    }
}

/// Stored sessions ordered by creation time. `None` when the record is unreadable.
fn read_sessions(store: &SharedStore) -> Option<Vec<Session>> {
    let Some(value) = lock(store).get(SESSIONS_KEY) else {
        return Some(Vec::new());
    };
    match serde_json::from_value::<Vec<Session>>(value) {
        Ok(mut sessions) => {
            sessions.sort_by_key(|s| s.created_at);
            Some(sessions)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Stored sessions unreadable");
            None
        }
    }
}
