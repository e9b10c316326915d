//! Key/value persistence for session records and focus state.
//!
//! The engine only needs `get`/`put`/`remove`/`keys`. `JsonFileStore` reads
//! `state.json` on every access and rewrites it atomically on every mutation,
//! touching only the key being changed. `MemoryStore` backs tests.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "sessions": [ ... ],
//!     "focus": { "focused_session_id": "...", "focused_directory": "..." }
//!   }
//! }
//! ```
//!
//! Empty, corrupt, or version-mismatched files load as an empty store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::write_atomic;
use crate::error::{Result, SwitchboardError};

const STORE_VERSION: u32 = 1;

pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<Value>;
    fn put(&mut self, key: &str, value: Value) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
    fn keys(&self) -> Vec<String>;
}

/// Store handle shared by the session registry and the focus arbiter.
pub type SharedStore = Arc<Mutex<dyn KeyValueStore>>;

pub fn shared(store: impl KeyValueStore + 'static) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Locks the store, recovering from poisoning.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, dyn KeyValueStore + 'static> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    entries: BTreeMap<String, Value>,
}

/// Store backed by `state.json`.
///
/// The CLI and `switchboard watch` may hold the same file open at once, so every
/// read goes to disk and every write is a read-modify-write of the one key
/// being changed. The in-memory copy is only a fallback for when the file
/// cannot be read.
pub struct JsonFileStore {
    entries: BTreeMap<String, Value>,
    file_path: PathBuf,
}

impl JsonFileStore {
    pub fn load(file_path: &Path) -> Result<Self> {
        Ok(JsonFileStore {
            entries: read_entries(file_path)?,
            file_path: file_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Latest entries on disk, or the last known ones if the file is unreadable.
    fn current(&self) -> BTreeMap<String, Value> {
        match read_entries(&self.file_path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "State file unreadable; using last known entries");
                self.entries.clone()
            }
        }
    }

    /// Applies `edit` to the entries on disk and writes the result. The cached
    /// copy is replaced only once the write succeeded.
    fn update<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, Value>) -> bool,
    {
        let mut entries = read_entries(&self.file_path)?;
        if edit(&mut entries) {
            save(&self.file_path, &entries)?;
        }
        self.entries = entries;
        Ok(())
    }
}

/// Reads the entries on disk. Missing, empty, corrupt, or version-mismatched
/// files read as empty.
fn read_entries(file_path: &Path) -> Result<BTreeMap<String, Value>> {
    if !file_path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = fs_err::read_to_string(file_path)
        .map_err(|e| SwitchboardError::io("reading state file", e))?;

    if content.trim().is_empty() {
        tracing::warn!(path = %file_path.display(), "Empty state file, starting with empty store");
        return Ok(BTreeMap::new());
    }

    match serde_json::from_str::<StoreFile>(&content) {
        Ok(file) if file.version == STORE_VERSION => Ok(file.entries),
        Ok(file) => {
            tracing::warn!(
                version = file.version,
                expected = STORE_VERSION,
                "Unsupported state file version, starting with empty store"
            );
            Ok(BTreeMap::new())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse state file, starting with empty store");
            Ok(BTreeMap::new())
        }
    }
}

fn save(file_path: &Path, entries: &BTreeMap<String, Value>) -> Result<()> {
    let file = StoreFile {
        version: STORE_VERSION,
        entries: entries.clone(),
    };
    let content = serde_json::to_string_pretty(&file)
        .map_err(|e| SwitchboardError::json("serializing state file", e))?;
    write_atomic(file_path, content.as_bytes())
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.current().get(key).cloned()
    }

    fn put(&mut self, key: &str, value: Value) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value);
            true
        })
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.update(|entries| entries.remove(key).is_some())
    }

    fn keys(&self) -> Vec<String> {
        self.current().keys().cloned().collect()
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
