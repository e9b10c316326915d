//! Hook notification payloads as written by the producer.
//!
//! One JSON object per file:
//!
//! ```json
//! { "session_id": "...", "cwd": "/work/api", "hook_event_name": "Notification",
//!   "notification_type": "permission_prompt", "tool_name": "Bash" }
//! ```
//!
//! Unknown event names and notification types deserialize to catch-all
//! variants so they still reach the state machine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwitchboardError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    PreToolUse,
    PostToolUse,
    PreCompact,
    Notification,
    Stop,
    SessionStart,
    SessionEnd,
    #[serde(other)]
    Unknown,
}

impl EventName {
    /// Every event name the hook installer registers.
    pub const ALL: [EventName; 7] = [
        EventName::PreToolUse,
        EventName::PostToolUse,
        EventName::PreCompact,
        EventName::Notification,
        EventName::Stop,
        EventName::SessionStart,
        EventName::SessionEnd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::PreToolUse => "PreToolUse",
            EventName::PostToolUse => "PostToolUse",
            EventName::PreCompact => "PreCompact",
            EventName::Notification => "Notification",
            EventName::Stop => "Stop",
            EventName::SessionStart => "SessionStart",
            EventName::SessionEnd => "SessionEnd",
            EventName::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PermissionPrompt,
    IdlePrompt,
    UserCancelledToolUse,
    Message,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookEvent {
    #[serde(default)]
    pub session_id: String,
    pub cwd: String,
    #[serde(rename = "hook_event_name")]
    pub event_name: EventName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<NotificationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HookEvent {
    pub fn new(cwd: impl Into<String>, event_name: EventName) -> Self {
        Self {
            session_id: String::new(),
            cwd: cwd.into(),
            event_name,
            notification_type: None,
            tool_name: None,
            message: None,
            reason: None,
        }
    }

    pub fn with_notification(mut self, notification_type: NotificationType) -> Self {
        self.notification_type = Some(notification_type);
        self
    }

    /// Parses the contents of a notification file.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(SwitchboardError::EventParse {
                path: path.to_path_buf(),
                details: "file is empty".to_string(),
            });
        }

        let event: HookEvent =
            serde_json::from_str(content).map_err(|e| SwitchboardError::EventParse {
                path: path.to_path_buf(),
                details: e.to_string(),
            })?;

        if event.cwd.trim().is_empty() {
            return Err(SwitchboardError::EventParse {
                path: path.to_path_buf(),
                details: "cwd is empty".to_string(),
            });
        }

        Ok(event)
    }
}

/// Returns true for file names the producer writes (`{nanos}_{pid}.json`).
///
/// Hidden files are the producer's in-flight temp files.
pub fn is_notification_file(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    !name.starts_with('.') && name.ends_with(".json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<HookEvent> {
        HookEvent::parse(Path::new("/events/1_2.json"), content)
    }

    #[test]
    fn test_parses_full_notification() {
        let event = parse(
            r#"{"session_id":"abc","cwd":"/work/api","hook_event_name":"Notification",
                "notification_type":"permission_prompt","tool_name":"Bash","message":"Allow?"}"#,
        )
        .unwrap();

        assert_eq!(event.session_id, "abc");
        assert_eq!(event.cwd, "/work/api");
        assert_eq!(event.event_name, EventName::Notification);
        assert_eq!(
            event.notification_type,
            Some(NotificationType::PermissionPrompt)
        );
        assert_eq!(event.tool_name.as_deref(), Some("Bash"));
    }

    #[test]
    fn test_unknown_event_name_maps_to_unknown() {
        let event = parse(r#"{"cwd":"/w","hook_event_name":"UserPromptSubmit"}"#).unwrap();
        assert_eq!(event.event_name, EventName::Unknown);
    }

    #[test]
    fn test_unknown_notification_type_maps_to_other() {
        let event = parse(
            r#"{"cwd":"/w","hook_event_name":"Notification","notification_type":"elicitation_dialog"}"#,
        )
        .unwrap();
        assert_eq!(event.notification_type, Some(NotificationType::Other));
    }

    #[test]
    fn test_ignores_extra_fields() {
        let event = parse(
            r#"{"cwd":"/w","hook_event_name":"Stop","transcript_path":"/t.jsonl","stop_hook_active":false}"#,
        )
        .unwrap();
        assert_eq!(event.event_name, EventName::Stop);
    }

    #[test]
    fn test_rejects_missing_cwd() {
        assert!(matches!(
            parse(r#"{"hook_event_name":"Stop"}"#),
            Err(SwitchboardError::EventParse { .. })
        ));
    }

    #[test]
    fn test_rejects_truncated_json() {
        assert!(parse(r#"{"cwd":"/w","hook_event_na"#).is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn test_notification_file_pattern() {
        assert!(is_notification_file(Path::new("/e/1700000000000000000_42.json")));
        assert!(!is_notification_file(Path::new("/e/.tmpA1b2C3")));
        assert!(!is_notification_file(Path::new("/e/.1_2.json")));
        assert!(!is_notification_file(Path::new("/e/notes.txt")));
    }
}
