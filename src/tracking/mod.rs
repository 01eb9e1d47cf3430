//! Health, quality, and cost tracking.
//!
//! Every backend call attempt produces a `CallOutcome`; the trackers fold
//! outcomes into per-backend metrics and persist each update durably before
//! the call is considered recorded.

pub mod cost;
pub mod health;
pub mod quality;

pub use cost::{CostMetrics, CostTracker};
pub use health::{Health, HealthMetrics, HealthStatus, HealthTracker};
pub use quality::{QualityMetrics, QualityTracker};

use crate::backend::{BackendError, ExtractionResult, TokenUsage};
use crate::retry::ErrorClass;

/// Extraction-quality fields carried by a successful outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySample {
    pub confidence: f64,
    pub completeness: f64,
    pub validation_passed: bool,
}

/// The observable result of a single backend call attempt.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub backend_id: String,
    pub success: bool,
    pub latency_ms: u64,
    /// Error kind tag and message, present on failed attempts
    pub error: Option<(String, String)>,
    pub error_class: Option<ErrorClass>,
    /// Token usage, present on successful attempts
    pub usage: Option<TokenUsage>,
    /// Quality scalars, present when the payload is an extraction result
    pub quality: Option<QualitySample>,
}

impl CallOutcome {
    pub fn success(backend_id: &str, latency_ms: u64, result: &ExtractionResult) -> Self {
        Self {
            backend_id: backend_id.to_string(),
            success: true,
            latency_ms,
            error: None,
            error_class: None,
            usage: Some(result.usage),
            quality: Some(QualitySample {
                confidence: result.confidence,
                completeness: result.completeness,
                validation_passed: result.validation_passed,
            }),
        }
    }

    pub fn failure(
        backend_id: &str,
        latency_ms: u64,
        error: &BackendError,
        class: ErrorClass,
    ) -> Self {
        Self {
            backend_id: backend_id.to_string(),
            success: false,
            latency_ms,
            error: Some((error.kind().to_string(), error.to_string())),
            error_class: Some(class),
            usage: None,
            quality: None,
        }
    }
}
