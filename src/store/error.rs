//! Storage error types

use std::path::PathBuf;
use thiserror::Error;

/// Durable storage failures.
///
/// These are the most severe errors in the system: a swallowed write failure
/// means silent data loss, so every caller propagates them.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
