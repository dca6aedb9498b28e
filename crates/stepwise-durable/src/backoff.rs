//! Exponential backoff for failed Tasks.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use stepwise_contracts::error::{StepwiseError, StepwiseResult};

/// `delay(retries) = min(base * 2^retries, cap)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoffStrategy {
    base: Duration,
    cap: Duration,
}

impl ExponentialBackoffStrategy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    pub fn from_millis(base_ms: u64, cap_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(cap_ms))
    }

    /// The delay before retry number `retries`. Saturates at `cap`.
    pub fn delay_for(&self, retries: u32) -> Duration {
        2u32.checked_pow(retries)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.cap, |delay| delay.min(self.cap))
    }

    /// The earliest instant a Task that has failed `retries` times may run again.
    pub fn calculate_next_retry_time(&self, retries: u32) -> DateTime<Utc> {
        self.next_retry_time_from(Utc::now(), retries)
    }

    /// `calculate_next_retry_time` against an explicit clock reading.
    pub fn next_retry_time_from(&self, now: DateTime<Utc>, retries: u32) -> DateTime<Utc> {
        let delay = TimeDelta::from_std(self.delay_for(retries)).unwrap_or(TimeDelta::MAX);
        now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for ExponentialBackoffStrategy {
    fn default() -> Self {
        BackoffConfig::default().strategy()
    }
}

/// Backoff configuration.
///
/// ```toml
/// base_ms = 1000
/// cap_ms = 60000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub base_ms: u64,
    pub cap_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: 1_000,
            cap_ms: 60_000,
        }
    }
}

impl BackoffConfig {
    pub fn from_toml_str(s: &str) -> StepwiseResult<Self> {
        toml::from_str(s).map_err(|e| StepwiseError::Config {
            reason: format!("failed to parse backoff TOML: {}", e),
        })
    }

    pub fn from_file(path: &Path) -> StepwiseResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| StepwiseError::Config {
            reason: format!("failed to read backoff file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn strategy(&self) -> ExponentialBackoffStrategy {
        ExponentialBackoffStrategy::from_millis(self.base_ms, self.cap_ms)
    }
}
