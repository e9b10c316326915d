//! Filesystem event source for the notification drop-box.
//!
//! Wraps a `notify` watcher on the events directory and forwards qualifying
//! paths to a callback. The supervisor passes a closure that sends
//! `SupervisorMessage::FileReady` into its channel; tests skip this type and
//! call `IngestionWatcher::on_file_ready` directly.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{Result, SwitchboardError};

use super::types::is_notification_file;

/// Keeps the OS watcher alive; dropping it stops the watch.
pub struct NotifyEventSource {
    _watcher: RecommendedWatcher,
    events_dir: PathBuf,
}

impl NotifyEventSource {
    /// Starts watching `events_dir` (non-recursively), creating it if needed.
    pub fn start<F>(events_dir: &Path, mut on_file_ready: F) -> Result<Self>
    where
        F: FnMut(PathBuf) + Send + 'static,
    {
        fs_err::create_dir_all(events_dir)
            .map_err(|e| SwitchboardError::io("creating events directory", e))?;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        return;
                    }
                    for path in event.paths {
                        if is_notification_file(&path) {
                            on_file_ready(path);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Events directory watcher error");
                }
            }
        })?;

        watcher.watch(events_dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %events_dir.display(), "Watching events directory");

        Ok(Self {
            _watcher: watcher,
            events_dir: events_dir.to_path_buf(),
        })
    }

    pub fn events_dir(&self) -> &Path {
        &self.events_dir
    }
}
