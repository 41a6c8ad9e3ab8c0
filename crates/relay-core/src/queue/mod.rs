//! Serialized request queue: one worker, minimum spacing, bounded retries.

mod retry;
mod state;
mod worker;

#[cfg(test)]
mod test_support;

pub use retry::{RetryDecision, RetryPolicy};

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, Notify, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use self::state::QueueState;
use self::worker::Worker;
use crate::config::QueueConfig;
use crate::domain::{
    Completion, FailureRecord, ItemId, OperationKind, QueueError, QueueStatus, QueuedItem,
};
use crate::ports::{Clock, IdGenerator, SystemClock, Transport, UlidGenerator};

/// State shared between the handle and the worker task.
///
/// # Thread Safety
/// Everything mutable sits behind one `tokio::sync::Mutex`; no await happens
/// while it is held.
pub(crate) struct Shared {
    pub(crate) state: Mutex<QueueState>,
    pub(crate) notify: Notify,
    pub(crate) clock: Arc<dyn Clock>,
}

/// Handle to an item's eventual outcome.
///
/// Dropping the ticket does not cancel the item; it still runs and its result
/// is discarded.
#[derive(Debug)]
pub struct Ticket {
    id: ItemId,
    rx: oneshot::Receiver<Completion>,
}

impl Ticket {
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Wait for the parsed response body or the terminal error.
    pub async fn wait(self) -> Completion {
        // The sender only disappears without sending if the worker task died.
        self.rx.await.unwrap_or(Err(QueueError::ShutDown))
    }
}

/// Serializes calls to a rate-sensitive service.
///
/// Construct one per process and share it (e.g. in an `Arc`) with every
/// request handler that needs to reach the service.
///
/// # Example
/// ```ignore
/// let transport = Arc::new(HttpTransport::new(TransportConfig::from_env(), timeout)?);
/// let queue = SerializedRequestQueue::start(QueueConfig::default(), transport);
/// let body = queue.submit_and_wait(OperationKind::CreateMatch, json!({...})).await?;
/// ```
pub struct SerializedRequestQueue {
    shared: Arc<Shared>,
    id_gen: Arc<dyn IdGenerator>,
    shutdown_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SerializedRequestQueue {
    /// Spawn the worker on the current tokio runtime.
    pub fn start(config: QueueConfig, transport: Arc<dyn Transport>) -> Self {
        Self::start_with_clock(config, transport, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        config: QueueConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let id_gen = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        Self::start_with(config, transport, clock, id_gen)
    }

    /// Fully injected constructor: every port is supplied by the caller.
    pub fn start_with(
        config: QueueConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        id_gen: Arc<dyn IdGenerator>,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::new(config.failure_log_capacity)),
            notify: Notify::new(),
            clock,
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = Worker {
            shared: Arc::clone(&shared),
            transport,
            policy: RetryPolicy::from_config(&config),
            config,
        };
        let join = tokio::spawn(worker.run(shutdown_rx));

        Self {
            shared,
            id_gen,
            shutdown_tx,
            worker: Mutex::new(Some(join)),
        }
    }

    /// Enqueue an item at the tail. Never fails up front; every failure is
    /// delivered through the ticket.
    pub async fn submit(&self, kind: OperationKind, payload: Value) -> Ticket {
        let id = self.id_gen.generate_item_id();
        let (item, rx) = QueuedItem::new(id, kind, payload, self.shared.clock.now());

        {
            let mut state = self.shared.state.lock().await;
            if state.is_closed() {
                drop(state);
                item.complete(Err(QueueError::ShutDown));
                return Ticket { id, rx };
            }
            state.push_back(item);
        }
        self.shared.notify.notify_one();

        debug!(item_id = %id, %kind, "item enqueued");
        Ticket { id, rx }
    }

    /// Like `submit`, but takes the kind as a string and rejects unknown kinds
    /// before anything is enqueued.
    pub async fn submit_raw(&self, kind: &str, payload: Value) -> Result<Ticket, QueueError> {
        let kind: OperationKind = kind.parse()?;
        Ok(self.submit(kind, payload).await)
    }

    /// Submit and wait for the outcome.
    pub async fn submit_and_wait(&self, kind: OperationKind, payload: Value) -> Completion {
        self.submit(kind, payload).await.wait().await
    }

    pub async fn status(&self) -> QueueStatus {
        self.shared.state.lock().await.status()
    }

    /// Terminal failures, oldest first, bounded by `failure_log_capacity`.
    pub async fn recent_failures(&self) -> Vec<FailureRecord> {
        self.shared.state.lock().await.recent_failures()
    }

    /// Stop accepting work, let the in-flight attempt finish, and reject every
    /// item still waiting with `QueueError::ShutDown`.
    pub async fn shutdown(&self) {
        self.shared.state.lock().await.close();
        // ignore send error: the worker may already be gone
        let _ = self.shutdown_tx.send(true);

        let join = self.worker.lock().await.take();
        if let Some(join) = join {
            let _ = join.await;
        }

        let leftovers = self.shared.state.lock().await.drain();
        for item in leftovers {
            debug!(item_id = %item.id, "rejecting item on shutdown");
            item.complete(Err(QueueError::ShutDown));
        }
    }
}
