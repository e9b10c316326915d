//! Hook installation into Claude Code's `settings.json`.
//!
//! Switchboard only ever touches hook entries whose command contains the
//! `switchboard hook` marker. Every other key, event, matcher group and
//! command is written back untouched. Install always removes our entries
//! first and then adds a fresh set, so repeating it converges on one entry
//! per event. Writes are atomic (temp + rename).

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::write_atomic;
use crate::error::{Result, SwitchboardError};
use crate::events::EventName;
use crate::storage::StorageConfig;

/// Substring identifying our hook commands.
pub const HOOK_MARKER: &str = "switchboard hook";

const DEFAULT_HOOK_COMMAND: &str = "$HOME/.local/bin/switchboard hook";

/// Events that need `matcher: "*"` to fire for every tool.
fn needs_matcher(event: EventName) -> bool {
    matches!(event, EventName::PreToolUse | EventName::PostToolUse)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookStatus {
    NotInstalled,
    Installed,
    /// Some events are registered, others are not.
    Incomplete { missing: Vec<String> },
    PolicyBlocked { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    pub success: bool,
    pub message: String,
    pub settings_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallResult {
    Removed { entries: usize },
    NothingToUninstall,
}

#[derive(Debug, Clone)]
pub struct HookInstaller {
    settings_path: PathBuf,
    local_settings_path: PathBuf,
    command: String,
}

impl HookInstaller {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            settings_path: storage.claude_settings_file(),
            local_settings_path: storage.claude_root().join("settings.local.json"),
            command: DEFAULT_HOOK_COMMAND.to_string(),
        }
    }

    /// Overrides the installed command. It must still contain [`HOOK_MARKER`]
    /// or uninstall will not find it.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn status(&self) -> HookStatus {
        if let Some(reason) = self.check_policy_blocks() {
            return HookStatus::PolicyBlocked { reason };
        }

        let hooks = match self.read_settings() {
            Ok(Some(settings)) => settings.hooks.unwrap_or_default(),
            Ok(None) => return HookStatus::NotInstalled,
            Err(e) => {
                tracing::warn!(error = %e, "Settings unreadable while checking hooks");
                return HookStatus::NotInstalled;
            }
        };

        let missing: Vec<String> = EventName::ALL
            .iter()
            .filter(|event| {
                !hooks
                    .get(event.as_str())
                    .is_some_and(|groups| has_marked_hook(groups, needs_matcher(**event)))
            })
            .map(|event| event.as_str().to_string())
            .collect();

        if missing.is_empty() {
            HookStatus::Installed
        } else if missing.len() == EventName::ALL.len() {
            HookStatus::NotInstalled
        } else {
            HookStatus::Incomplete { missing }
        }
    }

    pub fn install(&self) -> Result<InstallResult> {
        if let Some(reason) = self.check_policy_blocks() {
            return Ok(InstallResult {
                success: false,
                message: format!("Cannot install hooks: {}", reason),
                settings_path: None,
            });
        }

        let mut settings = self.read_settings()?.unwrap_or_default();
        let hooks = settings.hooks.get_or_insert_with(BTreeMap::new);

        let removed = remove_marked(hooks);
        for event in EventName::ALL {
            let groups = hooks.entry(event.as_str().to_string()).or_default();
            groups.push(HookConfig {
                matcher: needs_matcher(event).then(|| "*".to_string()),
                hooks: Some(vec![InnerHook {
                    hook_type: Some("command".to_string()),
                    command: Some(self.command.clone()),
                    other: HashMap::new(),
                }]),
                other: HashMap::new(),
            });
            dedup_groups(groups);
        }

        self.write_settings(&settings)?;
        tracing::info!(
            path = %self.settings_path.display(),
            replaced = removed,
            "Hooks installed"
        );

        Ok(InstallResult {
            success: true,
            message: "Hooks configured successfully".to_string(),
            settings_path: Some(self.settings_path.to_string_lossy().to_string()),
        })
    }

    pub fn uninstall(&self) -> Result<UninstallResult> {
        let mut settings = match self.read_settings() {
            Ok(Some(settings)) => settings,
            Ok(None) => return Ok(UninstallResult::NothingToUninstall),
            Err(e) => {
                tracing::warn!(error = %e, "Settings unreadable; nothing to uninstall");
                return Ok(UninstallResult::NothingToUninstall);
            }
        };

        let Some(hooks) = settings.hooks.as_mut() else {
            return Ok(UninstallResult::NothingToUninstall);
        };
        let removed = remove_marked(hooks);
        if removed == 0 {
            return Ok(UninstallResult::NothingToUninstall);
        }
        if hooks.is_empty() {
            settings.hooks = None;
        }

        self.write_settings(&settings)?;
        tracing::info!(path = %self.settings_path.display(), entries = removed, "Hooks uninstalled");
        Ok(UninstallResult::Removed { entries: removed })
    }

    fn check_policy_blocks(&self) -> Option<String> {
        for path in [&self.settings_path, &self.local_settings_path] {
            let Ok(content) = fs_err::read_to_string(path) else {
                continue;
            };
            let Ok(settings) = serde_json::from_str::<serde_json::Value>(&content) else {
                continue;
            };
            if settings.get("disableAllHooks") == Some(&serde_json::Value::Bool(true)) {
                return Some("Hooks disabled by disableAllHooks setting".to_string());
            }
            if settings.get("allowManagedHooksOnly") == Some(&serde_json::Value::Bool(true)) {
                return Some("Only managed hooks allowed by allowManagedHooksOnly setting".to_string());
            }
        }
        None
    }

    /// `Ok(None)` when the file does not exist or is blank.
    fn read_settings(&self) -> Result<Option<SettingsFile>> {
        if !self.settings_path.exists() {
            return Ok(None);
        }
        let content = fs_err::read_to_string(&self.settings_path)
            .map_err(|e| SwitchboardError::io("reading Claude settings", e))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| SwitchboardError::ConfigMalformed {
                path: self.settings_path.clone(),
                details: format!(
                    "{e}. Fix the JSON syntax or delete the file to start fresh."
                ),
            })
    }

    fn write_settings(&self, settings: &SettingsFile) -> Result<()> {
        let content = serde_json::to_vec_pretty(settings)
            .map_err(|e| SwitchboardError::json("serializing Claude settings", e))?;
        write_atomic(&self.settings_path, &content)
    }
}

fn is_marked_command(cmd: Option<&str>) -> bool {
    cmd.is_some_and(|c| c.contains(HOOK_MARKER))
}

fn has_marked_hook(groups: &[HookConfig], needs_matcher: bool) -> bool {
    groups.iter().any(|group| {
        let marked = group
            .hooks
            .as_ref()
            .is_some_and(|inner| inner.iter().any(|h| is_marked_command(h.command.as_deref())));
        let matcher_ok =
            !needs_matcher || group.matcher.as_deref().is_some_and(|m| m.trim() == "*");
        marked && matcher_ok
    })
}

/// Strips every marked command. Groups, events and the map shrink only when
/// our removal emptied them. Returns the number of commands removed.
fn remove_marked(hooks: &mut BTreeMap<String, Vec<HookConfig>>) -> usize {
    let mut removed = 0;

    for groups in hooks.values_mut() {
        groups.retain_mut(|group| {
            let Some(inner) = group.hooks.as_mut() else {
                return true;
            };
            let before = inner.len();
            inner.retain(|h| !is_marked_command(h.command.as_deref()));
            let dropped = before - inner.len();
            removed += dropped;
            !(dropped > 0 && inner.is_empty())
        });
    }
    hooks.retain(|_, groups| !groups.is_empty());

    removed
}

fn dedup_groups(groups: &mut Vec<HookConfig>) {
    let mut seen: Vec<serde_json::Value> = Vec::new();
    groups.retain(|group| {
        let Ok(value) = serde_json::to_value(group) else {
            return true;
        };
        if seen.contains(&value) {
            false
        } else {
            seen.push(value);
            true
        }
    });
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    hooks: Option<BTreeMap<String, Vec<HookConfig>>>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HookConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    matcher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hooks: Option<Vec<InnerHook>>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InnerHook {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    hook_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs_err as fs;
    use serde_json::Value;
    use tempfile::TempDir;

    fn setup_test_env() -> (TempDir, StorageConfig) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".switchboard");
        let claude_root = temp.path().join(".claude");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&claude_root).unwrap();
        let storage = StorageConfig::with_roots(root, claude_root);
        (temp, storage)
    }

    fn read_settings(storage: &StorageConfig) -> Value {
        serde_json::from_str(&fs::read_to_string(storage.claude_settings_file()).unwrap()).unwrap()
    }

    fn marked_count(settings: &Value) -> usize {
        settings["hooks"]
            .as_object()
            .map(|events| {
                events
                    .values()
                    .flat_map(|groups| groups.as_array().cloned().unwrap_or_default())
                    .flat_map(|group| group["hooks"].as_array().cloned().unwrap_or_default())
                    .filter(|h| h["command"].as_str().is_some_and(|c| c.contains(HOOK_MARKER)))
                    .count()
            })
            .unwrap_or(0)
    }

    #[test]
    fn test_not_installed_without_settings() {
        let (_temp, storage) = setup_test_env();
        assert_eq!(HookInstaller::new(&storage).status(), HookStatus::NotInstalled);
    }

    #[test]
    fn test_install_creates_settings_with_every_event() {
        let (_temp, storage) = setup_test_env();
        let installer = HookInstaller::new(&storage);

        let result = installer.install().unwrap();
        assert!(result.success);

        let settings = read_settings(&storage);
        for event in EventName::ALL {
            assert!(settings["hooks"][event.as_str()].is_array(), "{event:?}");
        }
        assert_eq!(settings["hooks"]["PostToolUse"][0]["matcher"], "*");
        assert!(settings["hooks"]["Stop"][0].get("matcher").is_none());
        assert_eq!(
            settings["hooks"]["Stop"][0]["hooks"][0]["command"],
            DEFAULT_HOOK_COMMAND
        );
        assert_eq!(installer.status(), HookStatus::Installed);
    }

    #[test]
    fn test_install_is_idempotent() {
        let (_temp, storage) = setup_test_env();
        let installer = HookInstaller::new(&storage);

        installer.install().unwrap();
        installer.install().unwrap();
        installer.install().unwrap();

        assert_eq!(marked_count(&read_settings(&storage)), EventName::ALL.len());
    }

    #[test]
    fn test_install_replaces_stale_command_and_keeps_neighbours() {
        let (_temp, storage) = setup_test_env();
        let existing = r#"{
            "someOtherSetting": "value",
            "hooks": {
                "Stop": [
                    {"hooks": [
                        {"type": "command", "command": "/old/bin/switchboard hook"},
                        {"type": "command", "command": "notify.sh"}
                    ]}
                ],
                "CustomEvent": [{"hooks": [{"type": "command", "command": "custom.sh"}]}]
            }
        }"#;
        fs::write(storage.claude_settings_file(), existing).unwrap();

        HookInstaller::new(&storage).install().unwrap();

        let settings = read_settings(&storage);
        assert_eq!(settings["someOtherSetting"], "value");
        assert_eq!(
            settings["hooks"]["CustomEvent"][0]["hooks"][0]["command"],
            "custom.sh"
        );
        let stop = settings["hooks"]["Stop"].as_array().unwrap();
        assert_eq!(stop.len(), 2);
        assert_eq!(stop[0]["hooks"][0]["command"], "notify.sh");
        assert_eq!(stop[1]["hooks"][0]["command"], DEFAULT_HOOK_COMMAND);
        assert_eq!(marked_count(&settings), EventName::ALL.len());
    }

    #[test]
    fn test_install_refuses_corrupt_json() {
        let (_temp, storage) = setup_test_env();
        let corrupt = r#"{ invalid json }"#;
        fs::write(storage.claude_settings_file(), corrupt).unwrap();

        let result = HookInstaller::new(&storage).install();

        assert!(matches!(result, Err(SwitchboardError::ConfigMalformed { .. })));
        assert_eq!(fs::read_to_string(storage.claude_settings_file()).unwrap(), corrupt);
    }

    #[test]
    fn test_uninstall_prunes_only_our_entries() {
        let (_temp, storage) = setup_test_env();
        let existing = r#"{
            "hooks": {
                "Stop": [{"hooks": [{"type": "command", "command": "notify.sh"}]}]
            },
            "model": "opus"
        }"#;
        fs::write(storage.claude_settings_file(), existing).unwrap();
        let installer = HookInstaller::new(&storage);
        installer.install().unwrap();

        let result = installer.uninstall().unwrap();

        assert_eq!(
            result,
            UninstallResult::Removed {
                entries: EventName::ALL.len()
            }
        );
        let settings = read_settings(&storage);
        assert_eq!(settings["model"], "opus");
        let events = settings["hooks"].as_object().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(settings["hooks"]["Stop"][0]["hooks"][0]["command"], "notify.sh");
    }

    #[test]
    fn test_uninstall_drops_empty_hooks_map() {
        let (_temp, storage) = setup_test_env();
        let installer = HookInstaller::new(&storage);
        installer.install().unwrap();

        installer.uninstall().unwrap();

        assert!(read_settings(&storage).get("hooks").is_none());
        assert_eq!(installer.uninstall().unwrap(), UninstallResult::NothingToUninstall);
    }

    #[test]
    fn test_uninstall_without_settings_is_nothing() {
        let (_temp, storage) = setup_test_env();
        assert_eq!(
            HookInstaller::new(&storage).uninstall().unwrap(),
            UninstallResult::NothingToUninstall
        );
        assert!(!storage.claude_settings_file().exists());
    }

    #[test]
    fn test_status_reports_missing_events_and_matchers() {
        let (_temp, storage) = setup_test_env();
        let partial = r#"{
            "hooks": {
                "Stop": [{"hooks": [{"type": "command", "command": "switchboard hook"}]}],
                "PostToolUse": [{"hooks": [{"type": "command", "command": "switchboard hook"}]}]
            }
        }"#;
        fs::write(storage.claude_settings_file(), partial).unwrap();

        match HookInstaller::new(&storage).status() {
            HookStatus::Incomplete { missing } => {
                assert!(missing.contains(&"PostToolUse".to_string()));
                assert!(!missing.contains(&"Stop".to_string()));
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn test_policy_blocks_disable_all_hooks() {
        let (_temp, storage) = setup_test_env();
        fs::write(storage.claude_settings_file(), r#"{"disableAllHooks": true}"#).unwrap();
        let installer = HookInstaller::new(&storage);

        assert!(matches!(installer.status(), HookStatus::PolicyBlocked { .. }));
        assert!(!installer.install().unwrap().success);
    }

    #[test]
    fn test_policy_blocks_managed_hooks_only() {
        let (_temp, storage) = setup_test_env();
        fs::write(
            storage.claude_root().join("settings.local.json"),
            r#"{"allowManagedHooksOnly": true}"#,
        )
        .unwrap();

        assert!(matches!(
            HookInstaller::new(&storage).status(),
            HookStatus::PolicyBlocked { .. }
        ));
    }
}
