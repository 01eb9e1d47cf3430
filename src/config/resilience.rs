//! Circuit breaker and retry configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit breaker thresholds, shared by every backend's breaker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before a half-open probe is allowed
    pub cooldown_seconds: u64,
    /// Consecutive half-open successes required to close the circuit
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_seconds: 60,
            success_threshold: 1,
        }
    }
}

impl BreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

/// Backoff schedule for retrying transient failures.
///
/// `delay = min(base * 2^attempt, cap) + jitter`. The attempt count itself
/// is configured per backend (`BackendConfig::max_attempts`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
            jitter_ms: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_defaults() {
        let config = BreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.cooldown(), Duration::from_secs(60));
        assert_eq!(config.success_threshold, 1);
    }

    #[test]
    fn retry_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.base_delay_ms, 1_000);
        assert_eq!(config.max_delay_ms, 8_000);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: BreakerConfig = toml::from_str("failure_threshold = 3").unwrap();
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.cooldown_seconds, 60);
    }
}
