//! Event ingestion: turns a drop-box directory of notification files into
//! at-most-once `HookEvent` deliveries.
//!
//! ```text
//! on_file_ready(path) ──► dedup ──► read after `read_delay` ──► parse ──► Delivery
//!                                                              │
//!                                                              └──► delete after `cleanup_delay`
//! ```
//!
//! The watcher never sleeps or spawns: callers push paths in, ask for
//! `next_deadline()`, and call `poll(now)` when it passes. Time is always
//! passed in, so tests drive it with explicit `Instant`s.
//!
//! # Rules
//!
//! - A path is scheduled at most once; repeated notifications for it are ignored.
//! - Reads are delayed because the producer may still be writing.
//! - A file that fails to parse is marked processed and never retried.
//! - Files are deleted `cleanup_delay` after they were consumed, not immediately,
//!   so another reader of the same directory is not disrupted.
//! - Startup replays only the `backlog_limit` newest files; older ones are
//!   cleaned up without being delivered.

use std::collections::{HashSet, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use crate::config::SupervisorConfig;

use super::types::{is_notification_file, HookEvent};

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub events_dir: PathBuf,
    pub read_delay: Duration,
    pub cleanup_delay: Duration,
    pub backlog_limit: usize,
}

impl WatcherConfig {
    pub fn from_supervisor(events_dir: PathBuf, config: &SupervisorConfig) -> Self {
        Self {
            events_dir,
            read_delay: config.read_delay(),
            cleanup_delay: config.cleanup_delay(),
            backlog_limit: config.backlog_limit,
        }
    }
}

/// A parsed event ready for the state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub path: PathBuf,
    pub event: HookEvent,
}

/// Counters for what the watcher has done since it started.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestionStats {
    pub delivered: u32,
    pub duplicates_ignored: u32,
    pub malformed: u32,
    pub backlog_skipped: u32,
    pub files_removed: u32,
}

pub struct IngestionWatcher {
    config: WatcherConfig,
    processed: HashSet<PathBuf>,
    pending_reads: VecDeque<(Instant, PathBuf)>,
    pending_cleanup: VecDeque<(Instant, PathBuf)>,
    stats: IngestionStats,
}

impl IngestionWatcher {
    pub fn new(config: WatcherConfig) -> Self {
        Self {
            config,
            processed: HashSet::new(),
            pending_reads: VecDeque::new(),
            pending_cleanup: VecDeque::new(),
            stats: IngestionStats::default(),
        }
    }

    pub fn events_dir(&self) -> &Path {
        &self.config.events_dir
    }

    pub fn stats(&self) -> &IngestionStats {
        &self.stats
    }

    /// Push interface for the event source: `path` was created or modified.
    ///
    /// Returns true if the file was scheduled for reading, false if it was
    /// ignored (wrong name pattern or already processed).
    pub fn on_file_ready(&mut self, path: PathBuf, now: Instant) -> bool {
        if !is_notification_file(&path) {
            return false;
        }

        if !self.processed.insert(path.clone()) {
            self.stats.duplicates_ignored += 1;
            tracing::trace!(path = %path.display(), "Ignoring repeated notification");
            return false;
        }

        self.pending_reads
            .push_back((now + self.config.read_delay, path));
        true
    }

    /// Lists unconsumed files and returns deliveries for the newest `backlog_limit`,
    /// oldest first so the latest event for a directory is applied last.
    pub fn replay_backlog(&mut self, now: Instant) -> Vec<Delivery> {
        let entries = match fs_err::read_dir(&self.config.events_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list events directory for backlog replay");
                return Vec::new();
            }
        };

        let mut files: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_notification_file(path))
            .filter(|path| !self.processed.contains(path))
            .map(|path| {
                let modified = fs_err::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .collect();

        // Newest first; name breaks ties since names lead with a nanosecond timestamp.
        files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

        let limit = self.config.backlog_limit;
        let mut replay = Vec::new();
        for (index, (_, path)) in files.into_iter().enumerate() {
            self.processed.insert(path.clone());
            if index < limit {
                replay.push(path);
            } else {
                self.stats.backlog_skipped += 1;
                self.schedule_cleanup(path, now);
            }
        }

        if self.stats.backlog_skipped > 0 {
            tracing::info!(
                skipped = self.stats.backlog_skipped,
                limit,
                "Backlog exceeded replay limit; older files will be removed"
            );
        }

        replay.reverse();
        replay
            .into_iter()
            .filter_map(|path| self.consume(path, now))
            .collect()
    }

    /// Performs every read and cleanup whose deadline is at or before `now`.
    pub fn poll(&mut self, now: Instant) -> Vec<Delivery> {
        let mut deliveries = Vec::new();

        while let Some((deadline, _)) = self.pending_reads.front() {
            if *deadline > now {
                break;
            }
            let Some((_, path)) = self.pending_reads.pop_front() else {
                break;
            };
            if let Some(delivery) = self.consume(path, now) {
                deliveries.push(delivery);
            }
        }

        while let Some((deadline, _)) = self.pending_cleanup.front() {
            if *deadline > now {
                break;
            }
            let Some((_, path)) = self.pending_cleanup.pop_front() else {
                break;
            };
            self.remove_file(&path);
        }

        deliveries
    }

    /// Earliest instant at which `poll` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let read = self.pending_reads.front().map(|(d, _)| *d);
        let cleanup = self.pending_cleanup.front().map(|(d, _)| *d);
        match (read, cleanup) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn pending_reads(&self) -> usize {
        self.pending_reads.len()
    }

    pub fn pending_cleanups(&self) -> usize {
        self.pending_cleanup.len()
    }

    fn consume(&mut self, path: PathBuf, now: Instant) -> Option<Delivery> {
        let content = match fs_err::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Notification file vanished before read");
                self.processed.remove(&path);
                return None;
            }
            Err(e) => {
                self.stats.malformed += 1;
                tracing::warn!(path = %path.display(), error = %e, "Failed to read notification file");
                self.schedule_cleanup(path, now);
                return None;
            }
        };

        match HookEvent::parse(&path, &content) {
            Ok(event) => {
                self.stats.delivered += 1;
                tracing::debug!(
                    path = %path.display(),
                    event = event.event_name.as_str(),
                    cwd = %event.cwd,
                    "Hook event ingested"
                );
                self.schedule_cleanup(path.clone(), now);
                Some(Delivery { path, event })
            }
            Err(err) => {
                self.stats.malformed += 1;
                tracing::warn!(error = %err, "Skipping malformed notification file");
                self.schedule_cleanup(path, now);
                None
            }
        }
    }

    fn schedule_cleanup(&mut self, path: PathBuf, now: Instant) {
        self.pending_cleanup
            .push_back((now + self.config.cleanup_delay, path));
    }

    fn remove_file(&mut self, path: &Path) {
        match fs_err::remove_file(path) {
            Ok(()) => self.stats.files_removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove consumed notification file");
            }
        }
        self.processed.remove(path);
    }
}
