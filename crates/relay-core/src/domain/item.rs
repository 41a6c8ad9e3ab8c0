//! Queued item: one unit of deferred work plus its completion handle.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::errors::QueueError;
use super::ids::ItemId;
use super::kind::OperationKind;

/// Result delivered to the submitter.
pub type Completion = Result<Value, QueueError>;

/// A unit of deferred work.
///
/// `complete()` consumes the item, so it resolves its submitter at most once.
/// An item dropped without completing resolves the submitter with
/// `QueueError::ShutDown`.
#[derive(Debug)]
pub struct QueuedItem {
    pub id: ItemId,
    pub kind: OperationKind,
    pub payload: Value,

    /// Failed attempts so far. Never exceeds the configured maximum.
    pub retry_count: u32,

    /// Informational only.
    pub submitted_at: DateTime<Utc>,

    /// Earliest instant the next attempt may start (set by a scheduled retry).
    pub not_before: Option<Instant>,

    completion: oneshot::Sender<Completion>,
}

impl QueuedItem {
    pub fn new(
        id: ItemId,
        kind: OperationKind,
        payload: Value,
        submitted_at: DateTime<Utc>,
    ) -> (Self, oneshot::Receiver<Completion>) {
        let (tx, rx) = oneshot::channel();
        let item = Self {
            id,
            kind,
            payload,
            retry_count: 0,
            submitted_at,
            not_before: None,
            completion: tx,
        };
        (item, rx)
    }

    /// Record a failed attempt and hold the item until `not_before`.
    pub fn schedule_retry(&mut self, not_before: Instant) {
        self.retry_count += 1;
        self.not_before = Some(not_before);
    }

    /// Deliver the outcome to the submitter. Returns `false` if the submitter
    /// already dropped its ticket.
    pub fn complete(self, result: Completion) -> bool {
        self.completion.send(result).is_ok()
    }
}
