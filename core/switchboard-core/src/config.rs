//! Tunables for the supervisor, loaded from `~/.switchboard/config.json`.
//!
//! Every field has a default, so a missing or partial file is fine. A corrupt
//! file falls back to defaults with a warning.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Result, SwitchboardError};

pub const DEFAULT_READ_DELAY_MS: u64 = 100;
pub const DEFAULT_CLEANUP_DELAY_MS: u64 = 5_000;
pub const DEFAULT_BACKLOG_LIMIT: usize = 100;
pub const DEFAULT_CHANGE_CACHE_TTL_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Delay between a file notification and reading it (producer may still be writing).
    pub read_delay_ms: u64,
    /// Delay between delivering an event and deleting its file.
    pub cleanup_delay_ms: u64,
    /// Number of most recent backlog files replayed on startup.
    pub backlog_limit: usize,
    /// Lifetime of a cached change-set, measured from when it was computed.
    pub change_cache_ttl_ms: u64,
    /// `.code-workspace` file used as the workspace folder list.
    pub workspace_file: Option<PathBuf>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            read_delay_ms: DEFAULT_READ_DELAY_MS,
            cleanup_delay_ms: DEFAULT_CLEANUP_DELAY_MS,
            backlog_limit: DEFAULT_BACKLOG_LIMIT,
            change_cache_ttl_ms: DEFAULT_CHANGE_CACHE_TTL_MS,
            workspace_file: None,
        }
    }
}

impl SupervisorConfig {
    pub fn read_delay(&self) -> Duration {
        Duration::from_millis(self.read_delay_ms)
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }

    pub fn change_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.change_cache_ttl_ms)
    }
}

/// Loads the supervisor configuration, returning defaults if the file doesn't exist.
pub fn load_config(path: &Path) -> SupervisorConfig {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return SupervisorConfig::default(),
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Config file malformed; using defaults");
            SupervisorConfig::default()
        }
    }
}

/// Saves the configuration atomically (temp file + rename).
pub fn save_config(path: &Path, config: &SupervisorConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| SwitchboardError::json("serializing config", e))?;
    write_atomic(path, content.as_bytes())
}

/// Writes `bytes` to `path` through a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| SwitchboardError::ConfigMalformed {
        path: path.to_path_buf(),
        details: "path has no parent directory".to_string(),
    })?;
    fs_err::create_dir_all(parent)
        .map_err(|e| SwitchboardError::io(format!("creating {}", parent.display()), e))?;

    let write_failed = |source: std::io::Error| SwitchboardError::ConfigWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let mut temp = NamedTempFile::new_in(parent).map_err(write_failed)?;
    temp.write_all(bytes).map_err(write_failed)?;
    temp.flush().map_err(write_failed)?;
    temp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}
