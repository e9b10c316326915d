//! Error types for switchboard-core operations.
//!
//! Nothing in the engine is fatal: callers log these and fall back to a
//! previous or default state.

use std::path::PathBuf;

/// All errors that can occur in switchboard-core operations.
#[derive(Debug, thiserror::Error)]
pub enum SwitchboardError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Configuration write failed: {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Session Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("A session already exists for directory {directory} ({existing_id})")]
    DuplicateSessionDirectory {
        directory: String,
        existing_id: String,
    },

    #[error("Invalid session directory: {path}: {reason}")]
    InvalidSessionDirectory { path: String, reason: String },

    // ─────────────────────────────────────────────────────────────────────
    // Event Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Malformed notification file {path}: {details}")]
    EventParse { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Focus Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Workspace folder update rejected for {directory}")]
    FocusRejected { directory: String },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    // ─────────────────────────────────────────────────────────────────────
    // External Process Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Command execution failed: {command}: {details}")]
    CommandFailed { command: String, details: String },
}

impl SwitchboardError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SwitchboardError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        SwitchboardError::Json {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using SwitchboardError.
pub type Result<T> = std::result::Result<T, SwitchboardError>;

impl From<SwitchboardError> for String {
    fn from(err: SwitchboardError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = SwitchboardError::io(
            "reading settings",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "I/O error: reading settings: gone");

        let err = SwitchboardError::DuplicateSessionDirectory {
            directory: "/work/api".to_string(),
            existing_id: "01HX".to_string(),
        };
        assert!(err.to_string().contains("/work/api"));
    }
}
