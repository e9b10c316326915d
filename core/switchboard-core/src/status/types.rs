//! The four coarse runtime states a session directory can be in.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeStatus {
    /// Nothing observed, session ended, or the user has re-engaged.
    #[default]
    Idle,
    /// Claude is using tools or compacting.
    Running,
    /// Claude is waiting on a permission prompt.
    Stuck,
    /// Claude finished its turn and is waiting for the user.
    Complete,
}

impl RuntimeStatus {
    pub const ALL: [RuntimeStatus; 4] = [
        RuntimeStatus::Idle,
        RuntimeStatus::Running,
        RuntimeStatus::Stuck,
        RuntimeStatus::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeStatus::Idle => "idle",
            RuntimeStatus::Running => "running",
            RuntimeStatus::Stuck => "stuck",
            RuntimeStatus::Complete => "complete",
        }
    }

    /// States that ask for the user's attention.
    pub fn needs_attention(&self) -> bool {
        matches!(self, RuntimeStatus::Stuck | RuntimeStatus::Complete)
    }
}

impl std::fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
