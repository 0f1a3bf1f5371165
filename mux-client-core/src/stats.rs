//! Lightweight, always-on counters observing the reactor loop.
//!
//! Not part of the specification's core data model, but every collaborator
//! in this workspace exposes some observability surface; exposing internal
//! *queue* state is explicitly a non-goal, so these counters are monotonic
//! event tallies rather than a window into pending/inflight depth.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub(crate) struct Stats {
    submitted: AtomicU64,
    dispatched: AtomicU64,
    queued: AtomicU64,
    rejected: AtomicU64,
    replies: AtomicU64,
}

impl Stats {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reply(&self) {
        self.replies.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            replies: self.replies.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time read of [`Stats`]. Cheap to take; never blocks the
/// reactor thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Packets handed to `submit` since init.
    pub submitted: u64,
    /// Batch roots handed to the protocol client since init.
    pub dispatched: u64,
    /// Packets that merged into or started a pending root (excludes the
    /// immediate-dispatch fast path).
    pub queued: u64,
    /// Packets that failed local validation.
    pub rejected: u64,
    /// Replies observed from the protocol client.
    pub replies: u64,
}
