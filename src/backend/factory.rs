//! Backend factory: builds the configured backend set at startup.

use super::http::HttpBackend;
use super::ExtractionBackend;
use crate::config::{BackendConfig, ConfigError};
use reqwest::Client;
use std::sync::Arc;

/// Build one backend instance per config entry (enabled or not; the
/// orchestrator filters on `enabled` per request).
///
/// API keys are resolved from the environment variable named by
/// `api_key_env`. A missing variable is a configuration error: failing at
/// startup beats a guaranteed auth failure on the first request.
pub fn build_backends(
    configs: &[BackendConfig],
) -> Result<Vec<(BackendConfig, Arc<dyn ExtractionBackend>)>, ConfigError> {
    let client = Arc::new(Client::new());

    let mut backends: Vec<(BackendConfig, Arc<dyn ExtractionBackend>)> =
        Vec::with_capacity(configs.len());
    for config in configs {
        let api_key = match &config.api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| ConfigError::Validation {
                field: format!("backends.{}.api_key_env", config.id),
                message: format!("environment variable '{}' is not set", var),
            })?),
            None => None,
        };

        let backend = Arc::new(HttpBackend::new(
            config.id.clone(),
            config.name.clone(),
            config.url.clone(),
            api_key,
            client.clone(),
        ));

        tracing::debug!(backend_id = %config.id, url = %config.url, "Configured backend");
        backends.push((config.clone(), backend));
    }

    Ok(backends)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(id: &str, api_key_env: Option<&str>) -> BackendConfig {
        BackendConfig {
            id: id.to_string(),
            name: id.to_string(),
            url: "http://localhost:9999".to_string(),
            enabled: true,
            priority: 1,
            api_key_env: api_key_env.map(String::from),
            timeout_seconds: 5,
            max_attempts: 3,
            pricing: Default::default(),
        }
    }

    #[test]
    fn builds_backend_per_config() {
        let backends = build_backends(&[config("a", None), config("b", None)]).unwrap();
        assert_eq!(backends.len(), 2);
        assert_eq!(backends[0].1.id(), "a");
    }

    #[test]
    fn missing_api_key_env_is_an_error() {
        let result = build_backends(&[config("a", Some("QUORUM_TEST_MISSING_KEY"))]);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn api_key_read_from_env() {
        std::env::set_var("QUORUM_TEST_PRESENT_KEY", "sk-test");
        let result = build_backends(&[config("a", Some("QUORUM_TEST_PRESENT_KEY"))]);
        std::env::remove_var("QUORUM_TEST_PRESENT_KEY");
        assert!(result.is_ok());
    }
}
