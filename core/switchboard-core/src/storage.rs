//! Storage configuration and path management for Switchboard.
//!
//! `StorageConfig` is the single place that decides where things live on disk:
//!
//! - `~/.switchboard/events/`: drop-box the hook producer writes into
//! - `~/.switchboard/state.json`: sessions and focus state
//! - `~/.switchboard/config.json`: tunables
//! - `~/.switchboard/switchboard.code-workspace`: default workspace folder list
//! - `~/.switchboard/logs/`: rolling log files
//! - `~/.claude/settings.json`: Claude Code settings (hook installer target)
//!
//! Tests use `StorageConfig::with_roots(temp, temp_claude)` for isolation.

use std::path::{Path, PathBuf};

use crate::error::{Result, SwitchboardError};

/// Central configuration for all Switchboard storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for Switchboard data (default: ~/.switchboard)
    root: PathBuf,
    /// Root directory for Claude Code data (default: ~/.claude)
    claude_root: PathBuf,
}

impl StorageConfig {
    /// Resolves the default roots under the user's home directory.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(SwitchboardError::HomeDirNotFound)?;
        Ok(Self {
            root: home.join(".switchboard"),
            claude_root: home.join(".claude"),
        })
    }

    /// Uses a custom Switchboard root, keeping Claude data under the home directory.
    pub fn with_root(root: PathBuf) -> Result<Self> {
        let home = dirs::home_dir().ok_or(SwitchboardError::HomeDirNotFound)?;
        Ok(Self {
            root,
            claude_root: home.join(".claude"),
        })
    }

    /// Creates a StorageConfig with both roots overridden.
    pub fn with_roots(root: PathBuf, claude_root: PathBuf) -> Self {
        Self { root, claude_root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn claude_root(&self) -> &Path {
        &self.claude_root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Switchboard Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Directory the hook producer drops one `{nanos}_{pid}.json` file into per event.
    pub fn events_dir(&self) -> PathBuf {
        self.root.join("events")
    }

    /// Key/value document holding session records and focus state.
    pub fn state_file(&self) -> PathBuf {
        self.root.join("state.json")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Workspace file used when `workspace_file` is not configured.
    pub fn default_workspace_file(&self) -> PathBuf {
        self.root.join("switchboard.code-workspace")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Claude Code Paths
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to Claude Code's settings file. We only ever touch our own hook entries.
    pub fn claude_settings_file(&self) -> PathBuf {
        self.claude_root.join("settings.json")
    }

    /// Creates the root and events directories if needed.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.root.clone(), self.events_dir()] {
            fs_err::create_dir_all(&dir)
                .map_err(|e| SwitchboardError::io(format!("creating {}", dir.display()), e))?;
        }
        Ok(())
    }
}
