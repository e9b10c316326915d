//! Runtime status inference.
//!
//! Status is inferred purely from hook event types, keyed by the directory the
//! event came from (not by session id, since events only carry `cwd`).
//!
//! - [`types`]: the four-valued `RuntimeStatus`
//! - [`transition`]: the pure event → status table
//! - [`tracker`]: the owned per-directory map, plus reset/override signals

mod tracker;
mod transition;
mod types;

pub use tracker::{StatusCause, StatusChange, StatusEntry, StatusSnapshot, StatusTracker};
pub use transition::next_status;
pub use types::RuntimeStatus;
