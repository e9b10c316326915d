//! Observer bus for status changes.
//!
//! The core owns a registry of subscriber callbacks; nothing here depends on a
//! UI toolkit. Publishers call [`ObserverBus::publish`] only for real changes
//! (see `StatusTracker`), so subscribers never see refreshes.
//!
//! Every publish carries the change plus a snapshot of all sessions' statuses,
//! which is what [`StatusSummary`] recomputes its counters from.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::status::{RuntimeStatus, StatusChange, StatusSnapshot};

pub type SubscriberId = u64;

type Subscriber = Box<dyn FnMut(&StatusChange, &StatusSnapshot) + Send>;

#[derive(Default)]
pub struct ObserverBus {
    next_id: SubscriberId,
    subscribers: Vec<(SubscriberId, Subscriber)>,
}

impl ObserverBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriberId
    where
        F: FnMut(&StatusChange, &StatusSnapshot) + Send + 'static,
    {
        self.next_id += 1;
        self.subscribers.push((self.next_id, Box::new(subscriber)));
        self.next_id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Delivers `change` to every subscriber, in subscription order.
    pub fn publish(&mut self, change: &StatusChange, snapshot: &StatusSnapshot) {
        tracing::debug!(
            directory = %change.directory,
            to = %change.current,
            subscribers = self.subscribers.len(),
            "Publishing status change"
        );
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(change, snapshot);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl std::fmt::Debug for ObserverBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Aggregate counters over every tracked session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub idle: usize,
    pub running: usize,
    pub stuck: usize,
    pub complete: usize,
}

impl StatusSummary {
    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Self {
        let mut summary = Self::default();
        for status in snapshot.statuses.values() {
            match status {
                RuntimeStatus::Idle => summary.idle += 1,
                RuntimeStatus::Running => summary.running += 1,
                RuntimeStatus::Stuck => summary.stuck += 1,
                RuntimeStatus::Complete => summary.complete += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.idle + self.running + self.stuck + self.complete
    }

    pub fn needing_attention(&self) -> usize {
        self.stuck + self.complete
    }
}

impl std::fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} running, {} stuck, {} complete, {} idle",
            self.running, self.stuck, self.complete, self.idle
        )
    }
}

/// Latest summary, kept current by a bus subscription.
#[derive(Debug, Clone, Default)]
pub struct SummaryView {
    latest: Arc<Mutex<StatusSummary>>,
}

impl SummaryView {
    pub fn attach(bus: &mut ObserverBus) -> Self {
        let view = Self::default();
        let latest = Arc::clone(&view.latest);
        bus.subscribe(move |_, snapshot| {
            let summary = StatusSummary::from_snapshot(snapshot);
            *latest.lock().unwrap_or_else(|p| p.into_inner()) = summary;
        });
        view
    }

    /// Replaces the summary outright, e.g. after sessions are added or removed.
    pub fn refresh(&self, snapshot: &StatusSnapshot) {
        *self.latest.lock().unwrap_or_else(|p| p.into_inner()) =
            StatusSummary::from_snapshot(snapshot);
    }

    pub fn current(&self) -> StatusSummary {
        *self.latest.lock().unwrap_or_else(|p| p.into_inner())
    }
}
