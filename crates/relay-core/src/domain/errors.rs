//! Errors and their classification.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single dispatch attempt.
///
/// Every variant is retryable from the queue's point of view: the retry policy
/// cannot tell a transient outage from a permanent one, so it treats them
/// alike and lets the retry budget decide.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Network failure or unreadable response body.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the body's `error` field when present.
    #[error("endpoint returned {status}: {message}")]
    Status { status: u16, message: String },

    /// 2xx response whose body says `"success": false`.
    #[error("operation rejected: {0}")]
    Rejected(String),

    /// The attempt did not finish within the per-attempt timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// 2xx response that is not the expected JSON shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The transport panicked or its task was cancelled mid-attempt.
    #[error("dispatch crashed: {0}")]
    Crashed(String),
}

/// Error delivered to a caller of the queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The kind string does not name a supported operation.
    #[error("unsupported operation kind: {0:?}")]
    UnsupportedKind(String),

    /// Every attempt failed. Displays as the final attempt's error.
    #[error("{error}")]
    RetriesExhausted {
        retry_count: u32,
        #[source]
        error: DispatchError,
    },

    /// The queue shut down before the item ran.
    #[error("queue shut down before the item was executed")]
    ShutDown,
}
