//! relay-core
//!
//! Serialized request queue for the arena's blockchain calls.
//!
//! # Modules
//! - **domain**: item model, operation kinds, errors, status views
//! - **ports**: seams to the outside (`Transport`, `Clock`, `IdGenerator`)
//! - **impls**: `HttpTransport` over reqwest
//! - **queue**: `SerializedRequestQueue` (single worker, spacing, retries)
//! - **config**: timing/retry knobs and endpoint configuration
//! - **observability**: tracing subscriber setup

pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;

pub use config::{ConfigError, QueueConfig, TransportConfig};
pub use domain::{DispatchError, FailureRecord, ItemId, OperationKind, QueueError, QueueStatus};
pub use impls::HttpTransport;
pub use ports::Transport;
pub use queue::{SerializedRequestQueue, Ticket};
