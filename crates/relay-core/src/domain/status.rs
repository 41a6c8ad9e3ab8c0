//! Read-only views for observability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ItemId;
use super::kind::OperationKind;

/// Snapshot of the queue. Not authoritative; it may be stale by the time the
/// caller reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Items waiting at the queue (excludes the one the worker holds).
    pub pending_count: usize,
    pub is_processing: bool,
    /// Wall-clock time of the last successful dispatch.
    pub last_execution_at: Option<DateTime<Utc>>,
}

/// An item that ran out of retries.
///
/// The payload is kept so the failure can be inspected or replayed by hand;
/// nothing replays it automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub item_id: ItemId,
    pub kind: OperationKind,
    pub payload: serde_json::Value,
    pub retry_count: u32,
    pub last_error: String,
    pub submitted_at: DateTime<Utc>,
    pub failed_at: DateTime<Utc>,
}
