//! Domain model (IDs, kinds, items, errors, status views).

pub mod errors;
pub mod ids;
pub mod item;
pub mod kind;
pub mod status;

pub use errors::{DispatchError, QueueError};
pub use ids::ItemId;
pub use item::{Completion, QueuedItem};
pub use kind::OperationKind;
pub use status::{FailureRecord, QueueStatus};
