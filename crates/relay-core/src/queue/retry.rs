//! Retry policy: decides whether a failed item gets another attempt.

use std::time::Duration;

use crate::config::QueueConfig;

/// Fixed-delay retry policy with a bounded budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,

    /// Delay before each retry. Does not grow with the attempt number.
    pub delay: Duration,
}

/// What to do with an item whose attempt just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp,
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::fixed(config.max_retries, config.retry_delay)
    }

    /// Decide based on how many retries the item has already used.
    pub fn decide(&self, retry_count: u32) -> RetryDecision {
        if retry_count < self.max_retries {
            RetryDecision::Retry { delay: self.delay }
        } else {
            RetryDecision::GiveUp
        }
    }
}
