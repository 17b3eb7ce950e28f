use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for resolving documents against the replication substrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Upper bound for a single resolve attempt, in milliseconds.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Backoff after the first failed attempt, in milliseconds. Doubles per attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Ceiling for a single backoff delay, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Total attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_attempt_timeout_ms() -> u64 {
    8_000
}
fn default_backoff_base_ms() -> u64 {
    2_000
}
fn default_max_backoff_ms() -> u64 {
    60_000
}
fn default_max_attempts() -> u32 {
    10
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: default_attempt_timeout_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ResolverConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Delay before the attempt following failed attempt `attempt` (0-based):
    /// `min(base * 2^attempt, max_backoff)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self.backoff_base_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }

    /// A short policy for profile lookups that should fail fast.
    pub fn quick() -> Self {
        Self {
            attempt_timeout_ms: 3_000,
            backoff_base_ms: 1_000,
            max_backoff_ms: 8_000,
            max_attempts: 3,
        }
    }
}

/// Acceptance policy for incoming attestations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustPolicy {
    /// Reject attestations that carry no signature at all. When `false`,
    /// unsigned attestations are still accepted (legacy transition window);
    /// attestations with an invalid signature are always rejected.
    #[serde(default)]
    pub require_signatures: bool,
}
