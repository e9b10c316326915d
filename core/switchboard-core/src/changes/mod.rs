//! Uncommitted changes across a session's repositories.
//!
//! A session directory is either a repository root itself or a plain folder
//! holding several roots as immediate children (one per worktree, say). The
//! aggregator queries every root independently and merges the results into
//! one session-relative list.

mod aggregator;
mod porcelain;
mod query;

pub use aggregator::{ChangeSetAggregator, ChangedFile};
pub use porcelain::{parse_porcelain_z, ChangeStatus, RepoChange};
pub use query::{discover_roots, GitCli, StatusQuery};
