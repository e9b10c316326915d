//! Multi-root change-set aggregation with a per-session TTL cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::paths::{join_relative, relative_to};
use crate::sessions::Session;

use super::porcelain::ChangeStatus;
use super::query::{discover_roots, StatusQuery};

/// A changed path, relative to the session directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedFile {
    pub path: String,
    pub status: ChangeStatus,
    pub absolute_path: PathBuf,
    pub git_root: PathBuf,
}

struct CacheEntry {
    created_at: Instant,
    files: Arc<Vec<ChangedFile>>,
}

/// Owns the change-set cache. Entries expire `ttl` after they were
/// created, regardless of how often they are read.
pub struct ChangeSetAggregator {
    query: Box<dyn StatusQuery>,
    ttl: Duration,
    cache: HashMap<String, CacheEntry>,
}

impl ChangeSetAggregator {
    pub fn new(query: Box<dyn StatusQuery>, ttl: Duration) -> Self {
        Self {
            query,
            ttl,
            cache: HashMap::new(),
        }
    }

    pub fn changed_files(&mut self, session: &Session) -> Arc<Vec<ChangedFile>> {
        self.changed_files_at(session, Instant::now())
    }

    /// Cached change-set for `session`, re-queried once the entry is `ttl` old.
    pub fn changed_files_at(&mut self, session: &Session, now: Instant) -> Arc<Vec<ChangedFile>> {
        self.evict_expired(now);

        if let Some(entry) = self.cache.get(&session.id) {
            tracing::trace!(session = %session.id, "Change-set cache hit");
            return Arc::clone(&entry.files);
        }

        let files = Arc::new(self.collect(session.directory_path()));
        self.cache.insert(
            session.id.clone(),
            CacheEntry {
                created_at: now,
                files: Arc::clone(&files),
            },
        );
        files
    }

    /// Drops the cached entry for a removed session.
    pub fn forget(&mut self, session_id: &str) {
        self.cache.remove(session_id);
    }

    pub fn cached_sessions(&self) -> usize {
        self.cache.len()
    }

    fn evict_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.cache
            .retain(|_, entry| now.saturating_duration_since(entry.created_at) < ttl);
    }

    fn collect(&self, directory: &Path) -> Vec<ChangedFile> {
        let roots = discover_roots(self.query.as_ref(), directory);
        if roots.is_empty() {
            tracing::debug!(directory = %directory.display(), "No repository roots found");
        }

        let mut files = Vec::new();
        for root in roots {
            let changes = match self.query.changed_paths(&root) {
                Ok(changes) => changes,
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "Repository status query failed; omitting root");
                    continue;
                }
            };

            let prefix = relative_to(directory, &root).unwrap_or_default();
            files.extend(changes.into_iter().map(|change| ChangedFile {
                path: join_relative(&prefix, &change.path),
                status: change.status,
                absolute_path: root.join(&change.path),
                git_root: root.clone(),
            }));
        }

        tracing::debug!(directory = %directory.display(), files = files.len(), "Collected change-set");
        files
    }
}

impl std::fmt::Debug for ChangeSetAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSetAggregator")
            .field("ttl", &self.ttl)
            .field("cached_sessions", &self.cache.len())
            .finish()
    }
}
