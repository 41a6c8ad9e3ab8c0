//! Internal queue state, guarded by one mutex.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::domain::{FailureRecord, QueueStatus, QueuedItem};

/// Everything the worker and the submitters share.
///
/// Submitters only append (`push_back`). The worker pops the head and, for a
/// retry, puts the item back at the head (`push_front`). No await happens
/// while the lock is held.
pub(crate) struct QueueState {
    pending: VecDeque<QueuedItem>,

    /// Set while the worker holds an item; cleared when the queue drains.
    processing: bool,

    /// Runtime instant of the last successful execution (drives spacing).
    last_success: Option<Instant>,
    last_execution_at: Option<DateTime<Utc>>,

    failures: VecDeque<FailureRecord>,
    failure_capacity: usize,

    /// No more work is accepted once set.
    closed: bool,
}

impl QueueState {
    pub(crate) fn new(failure_capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            processing: false,
            last_success: None,
            last_execution_at: None,
            failures: VecDeque::with_capacity(failure_capacity),
            failure_capacity,
            closed: false,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    pub(crate) fn push_back(&mut self, item: QueuedItem) {
        self.pending.push_back(item);
    }

    /// Retried items jump ahead of everything still waiting.
    pub(crate) fn push_front(&mut self, item: QueuedItem) {
        self.pending.push_front(item);
    }

    /// Take the head for execution and update the processing flag.
    pub(crate) fn pop_next(&mut self) -> Option<QueuedItem> {
        let next = self.pending.pop_front();
        self.processing = next.is_some();
        next
    }

    /// Earliest instant `item` may be dispatched: spacing after the last
    /// success, and the item's own retry delay, whichever is later.
    pub(crate) fn ready_at(&self, item: &QueuedItem, min_spacing: Duration) -> Instant {
        let now = Instant::now();
        let spacing = self.last_success.map(|at| at + min_spacing).unwrap_or(now);
        let retry = item.not_before.unwrap_or(now);
        spacing.max(retry).max(now)
    }

    pub(crate) fn record_success(&mut self, at: Instant, wall: DateTime<Utc>) {
        self.last_success = Some(at);
        self.last_execution_at = Some(wall);
    }

    pub(crate) fn record_failure(&mut self, record: FailureRecord) {
        if self.failure_capacity == 0 {
            return;
        }
        while self.failures.len() >= self.failure_capacity {
            self.failures.pop_front();
        }
        self.failures.push_back(record);
    }

    pub(crate) fn recent_failures(&self) -> Vec<FailureRecord> {
        self.failures.iter().cloned().collect()
    }

    pub(crate) fn drain(&mut self) -> Vec<QueuedItem> {
        self.processing = false;
        self.pending.drain(..).collect()
    }

    pub(crate) fn status(&self) -> QueueStatus {
        QueueStatus {
            pending_count: self.pending.len(),
            is_processing: self.processing,
            last_execution_at: self.last_execution_at,
        }
    }
}
