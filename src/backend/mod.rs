//! Backend abstraction layer.
//!
//! This module provides the `ExtractionBackend` trait: the single opaque
//! operation the orchestrator needs from a language-model provider. Concrete
//! implementations are built by the factory from configuration; the
//! orchestrator never inspects the physical transport.

use async_trait::async_trait;
use std::time::Duration;

pub mod error;
pub mod factory;
pub mod http;
pub mod types;

pub use error::BackendError;
pub use types::{ExtractionRequest, ExtractionResult, FieldValue, TokenUsage};

/// Unified interface for all extraction backends.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as
/// `Arc<dyn ExtractionBackend>`.
///
/// # Cancellation Safety
///
/// `extract` is cancellation-safe: dropping the future aborts any in-flight
/// request. The orchestrator relies on this when a fan-out deadline expires.
#[async_trait]
pub trait ExtractionBackend: Send + Sync + 'static {
    /// Stable identifier, matching `BackendConfig::id`.
    fn id(&self) -> &str;

    /// Human-readable name for logging and reports.
    fn name(&self) -> &str;

    /// Extract structured facts from one message.
    ///
    /// # Returns
    ///
    /// - `Ok(ExtractionResult)` carrying the payload, quality scalars, and token usage
    /// - `Err(BackendError::Timeout)` if the call exceeded `timeout`
    /// - `Err(BackendError::RateLimited)` on 429/quota rejection
    /// - `Err(BackendError::Network | Upstream | Auth | InvalidResponse)` otherwise
    async fn extract(
        &self,
        request: &ExtractionRequest,
        timeout: Duration,
    ) -> Result<ExtractionResult, BackendError>;
}
