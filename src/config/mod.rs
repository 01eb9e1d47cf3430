//! Configuration module for Quorum
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`QUORUM_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)

pub mod backend;
pub mod error;
pub mod logging;
pub mod orchestration;
pub mod resilience;
pub mod storage;

pub use backend::{BackendConfig, BackendPricing};
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use orchestration::OrchestrationConfig;
pub use resilience::{BreakerConfig, RetryConfig};
pub use storage::StorageConfig;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Unified configuration for the Quorum orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QuorumConfig {
    /// Orchestration strategy settings
    pub orchestration: OrchestrationConfig,
    /// Circuit breaker thresholds
    pub breaker: BreakerConfig,
    /// Retry backoff schedule
    pub retry: RetryConfig,
    /// Durable storage location
    pub storage: StorageConfig,
    /// Static backend definitions
    pub backends: Vec<BackendConfig>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl QuorumConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports QUORUM_* environment variables for common settings.
    /// An unparseable value is rejected with a warning and the configured
    /// value is kept.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(strategy) = std::env::var("QUORUM_STRATEGY") {
            match strategy.parse() {
                Ok(s) => self.orchestration.strategy = s,
                Err(e) => {
                    tracing::warn!(value = %strategy, error = %e, "Ignoring QUORUM_STRATEGY")
                }
            }
        }
        if let Ok(dir) = std::env::var("QUORUM_DATA_DIR") {
            self.storage.data_dir = dir.into();
        }
        if let Ok(level) = std::env::var("QUORUM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("QUORUM_LOG_FORMAT") {
            match format.parse() {
                Ok(f) => self.logging.format = f,
                Err(e) => {
                    tracing::warn!(value = %format, error = %e, "Ignoring QUORUM_LOG_FORMAT")
                }
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (i, backend) in self.backends.iter().enumerate() {
            if backend.id.is_empty() {
                return Err(ConfigError::MissingField(format!("backends[{}].id", i)));
            }
            if backend.url.is_empty() {
                return Err(ConfigError::MissingField(format!("backends[{}].url", i)));
            }
            if backend.max_attempts == 0 {
                return Err(ConfigError::Validation {
                    field: format!("backends[{}].max_attempts", i),
                    message: "must be at least 1".to_string(),
                });
            }
            if !seen.insert(backend.id.as_str()) {
                return Err(ConfigError::Validation {
                    field: format!("backends[{}].id", i),
                    message: format!("duplicate backend id '{}'", backend.id),
                });
            }
        }

        if self.orchestration.min_agreement == 0 {
            return Err(ConfigError::Validation {
                field: "orchestration.min_agreement".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let threshold = self.orchestration.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Validation {
                field: "orchestration.similarity_threshold".to_string(),
                message: "must be between 0 and 1".to_string(),
            });
        }

        Ok(())
    }
}
