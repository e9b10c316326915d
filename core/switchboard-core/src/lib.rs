//! # switchboard-core
//!
//! Status inference and change tracking for a fleet of Claude Code sessions,
//! one per working directory.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. One driver thread owns all state.
//! - **Single owner**: The status map belongs to `StatusTracker`, focus to
//!   `FocusArbiter`, the change-set cache to `ChangeSetAggregator`. Everyone
//!   else reads snapshots.
//! - **Graceful degradation**: Nothing here is fatal. Malformed files, failed
//!   git queries and rejected folder edits are logged and skipped.
//! - **Injectable collaborators**: Storage, workspace folders, status queries,
//!   prompts and host actions are traits, so tests never need a real host.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchboard_core::{Supervisor, SupervisorParts};
//!
//! let supervisor = Supervisor::new(parts);
//! std::thread::spawn(move || supervisor.run(rx));
//! tx.send(SupervisorMessage::FileReady(path))?;
//! ```

pub mod bus;
pub mod changes;
pub mod config;
pub mod error;
pub mod events;
pub mod focus;
pub mod paths;
pub mod prompts;
pub mod sessions;
pub mod setup;
pub mod status;
pub mod storage;
pub mod store;
pub mod supervisor;

pub use bus::{ObserverBus, StatusSummary, SummaryView};
pub use changes::{ChangeSetAggregator, ChangeStatus, ChangedFile, GitCli, StatusQuery};
pub use config::{load_config, save_config, SupervisorConfig};
pub use error::{Result, SwitchboardError};
pub use events::{write_notification, EventName, HookEvent, NotificationType, NotifyEventSource};
pub use focus::{CodeWorkspaceFile, FocusArbiter, FocusOutcome, FocusState, UnfocusOutcome, WorkspaceFolders};
pub use prompts::{PromptAction, PromptPresenter, PromptRequest, PromptToken};
pub use sessions::{Session, SessionRegistry};
pub use setup::{HookInstaller, HookStatus, InstallResult, UninstallResult};
pub use status::{RuntimeStatus, StatusChange};
pub use storage::StorageConfig;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, SharedStore};
pub use supervisor::{
    CommandOutcome, HostActions, LoggingHost, Supervisor, SupervisorCommand, SupervisorMessage,
    SupervisorParts,
};
