//! Single-focus arbitration over the host's workspace folder list.
//!
//! At most one session directory is "focused" (surfaced as a workspace folder)
//! at a time. Transfers replace the previous folder in one splice, so the host
//! never observes an intermediate list. Every operation is all-or-nothing: a
//! rejected splice leaves both the list and `FocusState` untouched.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::write_atomic;
use crate::error::{Result, SwitchboardError};
use crate::paths::{directory_path, same_directory};
use crate::sessions::Session;
use crate::store::{lock, SharedStore};

const FOCUS_KEY: &str = "focus";

/// The host's ordered, mutable folder list.
pub trait WorkspaceFolders: Send {
    fn folders(&self) -> Vec<PathBuf>;

    /// Replaces `delete_count` entries at `start` with `inserts`.
    /// Returns false when the host rejects the edit; the list is then unchanged.
    fn splice(&mut self, start: usize, delete_count: usize, inserts: Vec<PathBuf>) -> bool;

    /// Releases any repository handle the host holds for `directory`.
    fn close_repository(&mut self, directory: &Path);
}

/// Persisted focus. Both fields are set, or neither is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusState {
    pub focused_session_id: Option<String>,
    pub focused_directory: Option<String>,
}

impl FocusState {
    fn focused(session: &Session) -> Self {
        Self {
            focused_session_id: Some(session.id.clone()),
            focused_directory: Some(session.directory.clone()),
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused_session_id.is_some()
    }

    fn is_consistent(&self) -> bool {
        self.focused_session_id.is_some() == self.focused_directory.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusOutcome {
    AlreadyFocused,
    /// The directory was already in the list; nothing was mutated.
    Adopted,
    /// The previously focused folder was swapped out in place.
    Replaced { previous: String },
    Appended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfocusOutcome {
    NothingFocused,
    Removed,
    /// The folder had already left the list; only the state was cleared.
    ClearedMissing,
}

pub struct FocusArbiter {
    state: FocusState,
    folders: Box<dyn WorkspaceFolders>,
    store: SharedStore,
}

impl FocusArbiter {
    /// Restores the persisted focus. Half-set or unreadable state loads as unfocused.
    pub fn load(folders: Box<dyn WorkspaceFolders>, store: SharedStore) -> Self {
        let state = read_state(&store);
        Self {
            state,
            folders,
            store,
        }
    }

    /// Picks up focus changes persisted by another process.
    pub fn reload(&mut self) {
        self.state = read_state(&self.store);
    }

    pub fn state(&self) -> &FocusState {
        &self.state
    }

    pub fn focus(&mut self, session: &Session) -> Result<FocusOutcome> {
        self.reload();
        if self.state.focused_session_id.as_deref() == Some(session.id.as_str()) {
            return Ok(FocusOutcome::AlreadyFocused);
        }

        let target = session.directory_path();
        let folders = self.folders.folders();

        if folders.iter().any(|f| same_directory(f, target)) {
            self.commit(FocusState::focused(session));
            tracing::info!(session = %session.id, directory = %session.directory, "Adopted existing workspace folder");
            return Ok(FocusOutcome::Adopted);
        }

        let previous = self.state.focused_directory.clone();
        let previous_index = previous.as_deref().and_then(|dir| {
            let dir = directory_path(dir);
            folders.iter().position(|f| same_directory(f, &dir))
        });

        let (start, delete_count) = match previous_index {
            Some(index) => (index, 1),
            None => (folders.len(), 0),
        };

        if let (Some(dir), Some(_)) = (previous.as_deref(), previous_index) {
            self.folders.close_repository(&directory_path(dir));
        }

        if !self
            .folders
            .splice(start, delete_count, vec![target.to_path_buf()])
        {
            tracing::warn!(session = %session.id, directory = %session.directory, "Workspace folder update rejected");
            return Err(SwitchboardError::FocusRejected {
                directory: session.directory.clone(),
            });
        }

        self.commit(FocusState::focused(session));
        tracing::info!(session = %session.id, directory = %session.directory, "Focused workspace");

        Ok(match (previous, previous_index) {
            (Some(previous), Some(_)) => FocusOutcome::Replaced { previous },
            _ => FocusOutcome::Appended,
        })
    }

    pub fn unfocus(&mut self) -> Result<UnfocusOutcome> {
        self.reload();
        let Some(directory) = self.state.focused_directory.clone() else {
            return Ok(UnfocusOutcome::NothingFocused);
        };

        let dir = directory_path(&directory);
        let index = self
            .folders
            .folders()
            .iter()
            .position(|f| same_directory(f, &dir));

        let outcome = match index {
            Some(index) => {
                self.folders.close_repository(&dir);
                if !self.folders.splice(index, 1, Vec::new()) {
                    tracing::warn!(directory = %directory, "Workspace folder removal rejected");
                    return Err(SwitchboardError::FocusRejected { directory });
                }
                UnfocusOutcome::Removed
            }
            None => {
                tracing::debug!(directory = %directory, "Focused folder already gone from workspace");
                UnfocusOutcome::ClearedMissing
            }
        };

        self.commit(FocusState::default());
        tracing::info!(directory = %directory, "Unfocused workspace");
        Ok(outcome)
    }

    /// Unfocuses first if the removed session held focus.
    pub fn on_session_removed(&mut self, session_id: &str) -> Result<Option<UnfocusOutcome>> {
        self.reload();
        if self.state.focused_session_id.as_deref() != Some(session_id) {
            return Ok(None);
        }
        self.unfocus().map(Some)
    }

    fn commit(&mut self, state: FocusState) {
        self.state = state;
        let persisted = serde_json::to_value(&self.state)
            .map_err(|e| SwitchboardError::json("serializing focus state", e))
            .and_then(|value| lock(&self.store).put(FOCUS_KEY, value));
        if let Err(e) = persisted {
            tracing::warn!(error = %e, "Failed to persist focus state");
        }
    }
}

fn read_state(store: &SharedStore) -> FocusState {
    lock(store)
        .get(FOCUS_KEY)
        .and_then(|value| match serde_json::from_value::<FocusState>(value) {
            Ok(state) if state.is_consistent() => Some(state),
            Ok(_) => {
                tracing::warn!("Stored focus state is half-set; treating as unfocused");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored focus state unreadable; treating as unfocused");
                None
            }
        })
        .unwrap_or_default()
}

impl std::fmt::Debug for FocusArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusArbiter")
            .field("state", &self.state)
            .finish()
    }
}

/// Workspace folders backed by a `.code-workspace` JSON document.
///
/// Only the `folders` array is touched; other keys are preserved. Relative
/// folder paths are resolved against the document's directory.
#[derive(Debug, Clone)]
pub struct CodeWorkspaceFile {
    path: PathBuf,
}

impl CodeWorkspaceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Value> {
        if !self.path.exists() {
            return Ok(json!({ "folders": [] }));
        }
        let content = fs_err::read_to_string(&self.path)
            .map_err(|e| SwitchboardError::io("reading workspace file", e))?;
        if content.trim().is_empty() {
            return Ok(json!({ "folders": [] }));
        }
        let document: Value = serde_json::from_str(&content)
            .map_err(|e| SwitchboardError::json("parsing workspace file", e))?;
        if !document.is_object() {
            return Err(SwitchboardError::ConfigMalformed {
                path: self.path.clone(),
                details: "workspace file is not a JSON object".to_string(),
            });
        }
        Ok(document)
    }

    fn resolve(&self, folder: &str) -> PathBuf {
        let path = Path::new(folder);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.path.parent() {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }
}

impl WorkspaceFolders for CodeWorkspaceFile {
    fn folders(&self) -> Vec<PathBuf> {
        let document = match self.read_document() {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Workspace file unreadable");
                return Vec::new();
            }
        };
        document
            .get("folders")
            .and_then(Value::as_array)
            .map(|folders| {
                folders
                    .iter()
                    .filter_map(|f| f.get("path").and_then(Value::as_str))
                    .map(|p| self.resolve(p))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn splice(&mut self, start: usize, delete_count: usize, inserts: Vec<PathBuf>) -> bool {
        let mut document = match self.read_document() {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Refusing to rewrite unreadable workspace file");
                return false;
            }
        };

        let Some(object) = document.as_object_mut() else {
            return false;
        };
        let folders = object
            .entry("folders")
            .or_insert_with(|| Value::Array(Vec::new()));
        let Some(list) = folders.as_array_mut() else {
            tracing::warn!(path = %self.path.display(), "Workspace `folders` is not an array");
            return false;
        };

        let end = start.saturating_add(delete_count);
        if end > list.len() {
            tracing::warn!(start, delete_count, len = list.len(), "Workspace splice out of bounds");
            return false;
        }
        list.splice(
            start..end,
            inserts
                .iter()
                .map(|p| json!({ "path": p.to_string_lossy() })),
        );

        let bytes = match serde_json::to_vec_pretty(&document) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize workspace file");
                return false;
            }
        };
        match write_atomic(&self.path, &bytes) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to write workspace file");
                false
            }
        }
    }

    fn close_repository(&mut self, directory: &Path) {
        tracing::debug!(directory = %directory.display(), "No repository handle to close");
    }
}

/// In-memory folder list with an injectable rejection switch.
#[derive(Debug, Clone, Default)]
pub struct MemoryFolders {
    pub folders: Arc<Mutex<Vec<PathBuf>>>,
    pub closed: Arc<Mutex<Vec<PathBuf>>>,
    pub reject: Arc<Mutex<bool>>,
    pub splices: Arc<Mutex<usize>>,
}

impl MemoryFolders {
    pub fn with_folders(folders: Vec<PathBuf>) -> Self {
        let memory = Self::default();
        *memory.folders.lock().unwrap_or_else(|p| p.into_inner()) = folders;
        memory
    }

    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.folders.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn set_reject(&self, reject: bool) {
        *self.reject.lock().unwrap_or_else(|p| p.into_inner()) = reject;
    }
}

impl WorkspaceFolders for MemoryFolders {
    fn folders(&self) -> Vec<PathBuf> {
        self.snapshot()
    }

    fn splice(&mut self, start: usize, delete_count: usize, inserts: Vec<PathBuf>) -> bool {
        if *self.reject.lock().unwrap_or_else(|p| p.into_inner()) {
            return false;
        }
        let mut folders = self.folders.lock().unwrap_or_else(|p| p.into_inner());
        let end = start.saturating_add(delete_count);
        if end > folders.len() {
            return false;
        }
        folders.splice(start..end, inserts);
        *self.splices.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        true
    }

    fn close_repository(&mut self, directory: &Path) {
        self.closed
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(directory.to_path_buf());
    }
}
