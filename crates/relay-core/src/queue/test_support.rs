//! Scripted `Transport` for queue tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::time::Instant;
use ulid::Ulid;

use crate::domain::{DispatchError, ItemId, OperationKind};
use crate::ports::{Clock, IdGenerator, Transport};

/// Behaviour of one dispatch call, consumed in order. Once the script runs
/// out every call succeeds.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Ok(Value),
    Fail(String),
    /// Sleep, then succeed. Longer than the dispatch timeout means a timeout.
    Hang(Duration),
    Panic(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub(crate) kind: OperationKind,
    pub(crate) payload: Value,
    pub(crate) at: Instant,
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn with_steps(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn dispatch(&self, kind: OperationKind, payload: &Value) -> Result<Value, DispatchError> {
        self.calls.lock().unwrap().push(Call {
            kind,
            payload: payload.clone(),
            at: Instant::now(),
        });
        let step = self.steps.lock().unwrap().pop_front();

        match step {
            None => Ok(json!({ "success": true })),
            Some(Step::Ok(value)) => Ok(value),
            Some(Step::Fail(message)) => Err(DispatchError::Rejected(message)),
            Some(Step::Hang(duration)) => {
                tokio::time::sleep(duration).await;
                Ok(json!({ "success": true }))
            }
            Some(Step::Panic(message)) => panic!("{message}"),
        }
    }
}

/// Clock that panics once armed.
#[derive(Default)]
pub(crate) struct ArmedClock {
    armed: AtomicBool,
}

impl ArmedClock {
    pub(crate) fn arm(&self, on: bool) {
        self.armed.store(on, Ordering::SeqCst);
    }
}

impl Clock for ArmedClock {
    fn now(&self) -> DateTime<Utc> {
        if self.armed.load(Ordering::SeqCst) {
            panic!("clock failure");
        }
        Utc::now()
    }
}

/// Item IDs 1, 2, 3, ... (zero timestamp).
#[derive(Default)]
pub(crate) struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub(crate) fn id(n: u64) -> ItemId {
        ItemId::from_ulid(Ulid::from_parts(0, n as u128))
    }
}

impl IdGenerator for SequentialIds {
    fn generate_item_id(&self) -> ItemId {
        Self::id(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
