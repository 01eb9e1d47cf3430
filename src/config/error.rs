//! Errors surfaced while loading and validating configuration.

use std::path::PathBuf;
use thiserror::Error;

/// What went wrong while turning a config file into a usable [`super::QuorumConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to parse config: {0}")]
    Parse(String),

    /// A value is present but unusable (out of range, duplicate, zero).
    #[error("invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    /// A field the orchestrator cannot run without is absent or empty.
    #[error("missing required field: {0}")]
    MissingField(String),
}
