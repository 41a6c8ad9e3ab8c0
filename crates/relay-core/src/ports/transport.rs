//! Transport port - the external service the queue serializes calls to.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{DispatchError, OperationKind};

/// Executes one attempt of one operation.
///
/// Implementations map each `OperationKind` to a fixed endpoint and return the
/// parsed response body on success. They do not retry and do not need to
/// enforce the per-attempt timeout; the queue wraps every call in one.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, kind: OperationKind, payload: &Value) -> Result<Value, DispatchError>;
}
