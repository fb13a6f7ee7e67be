//! Retry policy for transient geocoding failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Statuses whose `Retry-After` header replaces the computed backoff delay.
pub const RETRY_AFTER_STATUSES: [u16; 3] = [413, 429, 503];

/// Parses a `Retry-After` value: delta seconds or an HTTP date.
///
/// A date in the past yields a zero delay.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Exponential backoff applied to idempotent requests that fail with a
/// retryable HTTP status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub retryable_statuses: Vec<u16>,
    pub retryable_methods: Vec<String>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 120_000,
            retryable_statuses: vec![429, 500, 502, 503, 504],
            retryable_methods: vec!["GET".to_string(), "HEAD".to_string(), "OPTIONS".to_string()],
        }
    }
}

impl BackoffPolicy {
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    pub fn allows_method(&self, method: &str) -> bool {
        self.retryable_methods
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(method))
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    pub fn should_retry_status(&self, method: &str, status: u16, attempt: u32) -> bool {
        self.allows_method(method) && self.is_retryable_status(status) && self.has_attempts_left(attempt)
    }

    pub fn should_retry_transport(&self, method: &str, attempt: u32) -> bool {
        self.allows_method(method) && self.has_attempts_left(attempt)
    }

    /// Delay to wait after failed attempt `attempt`: `base * 2^(attempt-1)`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Delay after a retryable status: the server's `Retry-After` when the
    /// status carries one, else the exponential delay. Capped at `max_delay_ms`.
    pub fn delay_for_status(&self, attempt: u32, status: u16, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(delay) if RETRY_AFTER_STATUSES.contains(&status) => {
                delay.min(Duration::from_millis(self.max_delay_ms))
            }
            _ => self.delay_for(attempt),
        }
    }
}
