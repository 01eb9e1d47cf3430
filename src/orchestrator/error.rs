//! Orchestrator error types.

use crate::dlq::DlqError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("no enabled backends configured")]
    NoBackends,

    /// Every candidate backend failed or was rejected by its breaker.
    #[error("all backends failed ({kind}): {message}")]
    Exhausted {
        /// Stable kind tag of the last failure seen
        kind: String,
        message: String,
        /// Attempts actually made across all backends
        attempts: u32,
    },

    /// Like `Exhausted`, but the request was parked for later replay.
    #[error("all backends failed, saved for retry as {dlq_id}")]
    AllBackendsFailed { dlq_id: String },

    #[error(transparent)]
    Dlq(#[from] DlqError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}
