//! Request and result types shared by all backends.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A free-text message to extract structured facts from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Caller-supplied id used to correlate logs, metrics, and DLQ entries
    pub correlation_id: String,
    /// Where the message came from (channel, mailbox, filename, ...)
    #[serde(default)]
    pub source: String,
    /// The message body
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ExtractionRequest {
    pub fn new(correlation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            source: String::new(),
            text: text.into(),
            metadata: HashMap::new(),
        }
    }
}

/// A single extracted field with the backend's confidence in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: serde_json::Value,
    #[serde(default)]
    pub confidence: f64,
}

/// Token usage reported by a backend for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Structured facts extracted from one message by one backend.
///
/// The orchestrator treats `fields` as an opaque payload; only the quality
/// scalars and token usage are interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted fields keyed by field name (sorted for stable output)
    pub fields: BTreeMap<String, FieldValue>,
    /// Backend's self-reported overall confidence (0..1)
    #[serde(default)]
    pub confidence: f64,
    /// Fraction of expected fields the backend managed to fill (0..1)
    #[serde(default)]
    pub completeness: f64,
    /// Whether downstream validation of the payload passed
    #[serde(default)]
    pub validation_passed: bool,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl ExtractionResult {
    /// Mean confidence across all extracted fields.
    ///
    /// Falls back to the self-reported overall confidence when the result
    /// carries no fields.
    pub fn mean_field_confidence(&self) -> f64 {
        if self.fields.is_empty() {
            return self.confidence;
        }
        let sum: f64 = self.fields.values().map(|f| f.confidence).sum();
        sum / self.fields.len() as f64
    }
}
