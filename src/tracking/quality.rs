//! Extraction quality scoring per backend.
//!
//! Keeps running averages of confidence, completeness, and validation pass
//! rate, and collapses them into a single composite score used by the
//! quality-based selection mode.

use super::QualitySample;
use crate::store::{RecordStore, StoreError};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const NAMESPACE: &str = "quality";

/// Weights for the composite score.
const CONFIDENCE_WEIGHT: f64 = 0.4;
const COMPLETENESS_WEIGHT: f64 = 0.3;
const VALIDATION_WEIGHT: f64 = 0.3;

/// Persisted quality metrics for one backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityMetrics {
    pub total_extractions: u64,
    pub avg_confidence: f64,
    pub avg_completeness: f64,
    pub validation_passes: u64,
}

impl QualityMetrics {
    pub fn validation_pass_rate(&self) -> f64 {
        if self.total_extractions == 0 {
            return 0.0;
        }
        self.validation_passes as f64 / self.total_extractions as f64
    }

    /// Composite score in [0, 1]. A backend with no history scores 0.
    pub fn score(&self) -> f64 {
        if self.total_extractions == 0 {
            return 0.0;
        }
        CONFIDENCE_WEIGHT * self.avg_confidence
            + COMPLETENESS_WEIGHT * self.avg_completeness
            + VALIDATION_WEIGHT * self.validation_pass_rate()
    }

    /// Score scaled to [0, 100] for display.
    pub fn score_pct(&self) -> f64 {
        self.score() * 100.0
    }
}

/// Tracks per-backend quality metrics and persists every update.
pub struct QualityTracker {
    metrics: DashMap<String, QualityMetrics>,
    store: Arc<dyn RecordStore>,
}

impl QualityTracker {
    pub fn new(store: Arc<dyn RecordStore>) -> Result<Self, StoreError> {
        let metrics = DashMap::new();
        for (backend_id, value) in store.list_records(NAMESPACE)? {
            match serde_json::from_value::<QualityMetrics>(value) {
                Ok(m) => {
                    metrics.insert(backend_id, m);
                }
                Err(e) => {
                    tracing::warn!(%backend_id, error = %e, "Discarding unreadable quality record");
                }
            }
        }
        Ok(Self { metrics, store })
    }

    /// Fold one successful extraction into the backend's running averages.
    pub fn record_extraction(
        &self,
        backend_id: &str,
        sample: &QualitySample,
    ) -> Result<(), StoreError> {
        let mut entry = self.metrics.entry(backend_id.to_string()).or_default();

        entry.total_extractions += 1;
        let n = entry.total_extractions as f64;
        entry.avg_confidence += (sample.confidence - entry.avg_confidence) / n;
        entry.avg_completeness += (sample.completeness - entry.avg_completeness) / n;
        if sample.validation_passed {
            entry.validation_passes += 1;
        }

        let snapshot = entry.clone();
        let value = serde_json::to_value(&snapshot)?;
        self.store.write_record(NAMESPACE, backend_id, &value)
    }

    pub fn get_metrics(&self, backend_id: &str) -> QualityMetrics {
        self.metrics
            .get(backend_id)
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn get_all_metrics(&self) -> Vec<(String, QualityMetrics)> {
        let mut all: Vec<_> = self
            .metrics
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Pick the candidate with the best historical score.
    ///
    /// Candidates must be given in configured priority order. Ties (within
    /// float noise) fall to the cheaper backend, then to priority order.
    pub fn select_backend_by_quality<'a>(
        &self,
        candidates: &'a [String],
        cost: &super::cost::CostTracker,
    ) -> Option<&'a str> {
        let mut best: Option<(&'a str, f64, f64)> = None;
        for id in candidates {
            let score = self.get_metrics(id).score();
            let avg_cost = cost.avg_cost(id);
            match best {
                None => best = Some((id, score, avg_cost)),
                Some((_, best_score, best_cost)) => {
                    if score > best_score + 1e-9
                        || ((score - best_score).abs() <= 1e-9 && avg_cost < best_cost)
                    {
                        best = Some((id, score, avg_cost));
                    }
                }
            }
        }
        best.map(|(id, _, _)| id)
    }
}
