//! Operation kinds accepted by the queue.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::QueueError;

/// Closed set of operations the queue knows how to dispatch.
///
/// Each kind is bound to one fixed external endpoint (see
/// [`crate::config::TransportConfig`]). Adding a kind means adding a variant
/// here and an endpoint there; `match` exhaustiveness covers the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    CreateMatch,
    RecordMove,
}

impl OperationKind {
    pub const ALL: [OperationKind; 2] = [OperationKind::CreateMatch, OperationKind::RecordMove];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::CreateMatch => "create-match",
            OperationKind::RecordMove => "record-move",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| QueueError::UnsupportedKind(s.to_string()))
    }
}
