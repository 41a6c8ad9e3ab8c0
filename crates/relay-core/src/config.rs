//! Queue and transport configuration.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::domain::OperationKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Timing and retry knobs for `SerializedRequestQueue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Minimum gap between the last successful execution and the next dispatch.
    pub min_spacing: Duration,
    /// Extra attempts allowed after the first one.
    pub max_retries: u32,
    /// Fixed delay before a failed item is attempted again.
    pub retry_delay: Duration,
    /// Hard limit for one attempt.
    pub dispatch_timeout: Duration,
    /// How many terminal failures `recent_failures()` remembers.
    pub failure_log_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            min_spacing: Duration::from_millis(2000),
            max_retries: 3,
            retry_delay: Duration::from_millis(5000),
            dispatch_timeout: Duration::from_secs(30),
            failure_log_capacity: 100,
        }
    }
}

impl QueueConfig {
    /// Defaults, overridden by `RELAY_*` environment variables when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|var| env::var(var).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    /// `ConfigError::InvalidNumber` for a set variable that is not a
    /// non-negative integer. Unset variables keep their defaults.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let number = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            lookup(var).map(|raw| parse_number(var, raw)).transpose()
        };
        let millis = |var: &'static str| -> Result<Option<Duration>, ConfigError> {
            Ok(number(var)?.map(Duration::from_millis))
        };

        let defaults = Self::default();
        Ok(Self {
            min_spacing: millis("RELAY_MIN_SPACING_MS")?.unwrap_or(defaults.min_spacing),
            max_retries: number("RELAY_MAX_RETRIES")?
                .map(|n| n.min(u32::MAX as u64) as u32)
                .unwrap_or(defaults.max_retries),
            retry_delay: millis("RELAY_RETRY_DELAY_MS")?.unwrap_or(defaults.retry_delay),
            dispatch_timeout: millis("RELAY_DISPATCH_TIMEOUT_MS")?
                .unwrap_or(defaults.dispatch_timeout),
            failure_log_capacity: number("RELAY_FAILURE_LOG_CAPACITY")?
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
                .unwrap_or(defaults.failure_log_capacity),
        })
    }
}

/// Where each operation kind is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Arena API origin, e.g. `http://localhost:3000`.
    pub base_url: String,
    pub create_match_path: String,
    pub record_move_path: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            create_match_path: "/api/blockchain/create-match".to_string(),
            record_move_path: "/api/blockchain/record-move".to_string(),
        }
    }

    pub fn from_env() -> Self {
        let base_url =
            env::var("ARENA_API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let mut config = Self::new(base_url);
        if let Ok(path) = env::var("RELAY_CREATE_MATCH_PATH") {
            config.create_match_path = path;
        }
        if let Ok(path) = env::var("RELAY_RECORD_MOVE_PATH") {
            config.record_move_path = path;
        }
        config
    }

    /// Full URL for `kind`.
    pub fn endpoint(&self, kind: OperationKind) -> String {
        let path = match kind {
            OperationKind::CreateMatch => &self.create_match_path,
            OperationKind::RecordMove => &self.record_move_path,
        };
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_number(var: &'static str, raw: String) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidNumber { var, value: raw })
}
