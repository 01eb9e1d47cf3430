//! Backend configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-token-unit pricing for a backend, in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BackendPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Static configuration for a single extraction backend.
///
/// Loaded once at startup and immutable afterwards. `priority` orders
/// failover attempts (lower is tried first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Stable identifier used as the key for breakers, trackers, and DLQ records
    pub id: String,
    /// Human-readable name for logs and reports
    pub name: String,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Name of the environment variable holding the API key, if any
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Retry attempts per request against this backend (including the first)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub pricing: BackendPricing,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> u32 {
    50
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied_for_omitted_fields() {
        let toml = r#"
        id = "openai"
        name = "OpenAI"
        url = "https://api.openai.com"
        "#;

        let config: BackendConfig = toml::from_str(toml).unwrap();
        assert!(config.enabled);
        assert_eq!(config.priority, 50);
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.pricing.input_per_million, 0.0);
    }

    #[test]
    fn pricing_parsed() {
        let toml = r#"
        id = "claude"
        name = "Claude"
        url = "https://api.anthropic.com"
        priority = 1

        [pricing]
        input_per_million = 3.0
        output_per_million = 15.0
        "#;

        let config: BackendConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.priority, 1);
        assert_eq!(config.pricing.output_per_million, 15.0);
    }
}
