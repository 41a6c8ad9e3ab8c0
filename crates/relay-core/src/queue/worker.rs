//! The single worker task that owns dispatching.
//!
//! # Flow
//! 1. Wait for work (`Notify`) or shutdown.
//! 2. Pop the head item (sets the processing flag).
//! 3. Sleep until spacing and the item's retry delay allow it to run.
//! 4. Dispatch under the per-attempt timeout.
//! 5. Success: record the execution time and resolve the caller.
//!    Failure: put the item back at the head with a retry delay, or reject the
//!    caller once the retry budget is spent.
//!
//! Only this task calls `Transport::dispatch`, so at most one request is in
//! flight per queue.
//!
//! # Worker death
//! Each attempt runs in its own task, so a panicking transport costs one
//! attempt, not the worker. If the worker itself stops for any reason, the
//! queue is closed and every pending item is rejected with `ShutDown`.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::Shared;
use super::retry::{RetryDecision, RetryPolicy};
use super::state::QueueState;
use crate::config::QueueConfig;
use crate::domain::{DispatchError, FailureRecord, QueueError, QueuedItem};
use crate::ports::Transport;

pub(crate) struct Worker {
    pub(crate) shared: Arc<Shared>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: QueueConfig,
    pub(crate) policy: RetryPolicy,
}

impl Worker {
    pub(crate) async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let _close = CloseOnExit(Arc::clone(&self.shared));

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let next = self.shared.state.lock().await.pop_next();
            let Some(item) = next else {
                tokio::select! {
                    _ = self.shared.notify.notified() => {}
                    _ = shutdown_requested(&mut shutdown_rx) => break,
                }
                continue;
            };

            let ready_at = self
                .shared
                .state
                .lock()
                .await
                .ready_at(&item, self.config.min_spacing);

            // Waiting is interruptible; an attempt already in flight is not.
            tokio::select! {
                _ = tokio::time::sleep_until(ready_at) => {}
                _ = shutdown_requested(&mut shutdown_rx) => {
                    item.complete(Err(QueueError::ShutDown));
                    break;
                }
            }

            self.execute(item).await;
        }

        debug!("queue worker stopped");
    }

    async fn execute(&self, mut item: QueuedItem) {
        let attempt = item.retry_count + 1;
        debug!(item_id = %item.id, kind = %item.kind, attempt, "executing");

        match self.attempt(&item).await {
            Ok(value) => {
                let wall = self.shared.clock.now();
                self.shared
                    .state
                    .lock()
                    .await
                    .record_success(Instant::now(), wall);
                info!(item_id = %item.id, kind = %item.kind, retry_count = item.retry_count, "item succeeded");
                if !item.complete(Ok(value)) {
                    debug!("submitter dropped its ticket before completion");
                }
            }
            Err(error) => match self.policy.decide(item.retry_count) {
                RetryDecision::Retry { delay } => {
                    item.schedule_retry(Instant::now() + delay);
                    warn!(
                        item_id = %item.id,
                        kind = %item.kind,
                        retry_count = item.retry_count,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "attempt failed, retry scheduled"
                    );
                    self.shared.state.lock().await.push_front(item);
                }
                RetryDecision::GiveUp => {
                    error!(
                        item_id = %item.id,
                        kind = %item.kind,
                        retry_count = item.retry_count,
                        error = %error,
                        "retries exhausted"
                    );
                    let failed_at = self.shared.clock.now();
                    let record = FailureRecord {
                        item_id: item.id,
                        kind: item.kind,
                        payload: item.payload.clone(),
                        retry_count: item.retry_count,
                        last_error: error.to_string(),
                        submitted_at: item.submitted_at,
                        failed_at,
                    };
                    self.shared.state.lock().await.record_failure(record);

                    let retry_count = item.retry_count;
                    item.complete(Err(QueueError::RetriesExhausted { retry_count, error }));
                }
            },
        }
    }

    /// One dispatch under the per-attempt timeout, isolated in its own task.
    async fn attempt(&self, item: &QueuedItem) -> Result<Value, DispatchError> {
        let transport = Arc::clone(&self.transport);
        let kind = item.kind;
        let payload = item.payload.clone();
        let mut handle = tokio::spawn(async move { transport.dispatch(kind, &payload).await });

        match tokio::time::timeout(self.config.dispatch_timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(DispatchError::Crashed(describe(join_error))),
            Err(_) => {
                handle.abort();
                Err(DispatchError::Timeout(self.config.dispatch_timeout))
            }
        }
    }
}

fn describe(join_error: JoinError) -> String {
    if !join_error.is_panic() {
        return "dispatch task cancelled".to_string();
    }
    let panic = join_error.into_panic();
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "transport panicked".to_string()
    }
}

/// Closes the queue when the worker returns or unwinds.
struct CloseOnExit(Arc<Shared>);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.state.try_lock() {
            close_and_reject(&mut state);
            return;
        }
        // Lock is busy (a status read); finish on the runtime instead.
        let shared = Arc::clone(&self.0);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                close_and_reject(&mut *shared.state.lock().await);
            });
        }
    }
}

fn close_and_reject(state: &mut QueueState) {
    state.close();
    for item in state.drain() {
        debug!(item_id = %item.id, "rejecting item, worker stopped");
        item.complete(Err(QueueError::ShutDown));
    }
}

/// Resolves once shutdown is requested or the queue handle is gone.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
