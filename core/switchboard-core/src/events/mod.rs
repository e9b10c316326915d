//! Hook event ingestion.
//!
//! ```text
//! Claude Code → `switchboard hook` → events/{nanos}_{pid}.json → NotifyEventSource
//!    (hooks)        (producer)             (drop-box)              (OS watch)
//!                                                                      │
//!                                         IngestionWatcher ◄───────────┘
//!                                     (dedup, delay, parse, cleanup)
//! ```
//!
//! - [`types`]: the `HookEvent` payload and its event/notification enums
//! - [`watcher`]: at-most-once delivery with delayed reads and cleanup
//! - [`source`]: `notify`-backed push source for the watcher
//! - [`producer`]: atomic writer used by the hook command

pub mod producer;
pub mod source;
pub mod types;
pub mod watcher;

pub use producer::write_notification;
pub use source::NotifyEventSource;
pub use types::{is_notification_file, EventName, HookEvent, NotificationType};
pub use watcher::{Delivery, IngestionStats, IngestionWatcher, WatcherConfig};
