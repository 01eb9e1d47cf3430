//! Token usage and spend accounting per backend.

use crate::backend::types::TokenUsage;
use crate::config::BackendPricing;
use crate::store::{RecordStore, StoreError};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const NAMESPACE: &str = "cost";

/// Persisted cost metrics for one backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CostMetrics {
    pub total_calls: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost: f64,
}

impl CostMetrics {
    pub fn avg_cost_per_call(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.total_cost / self.total_calls as f64
    }
}

/// Accumulates token usage per backend, priced from the config's rate card.
pub struct CostTracker {
    metrics: DashMap<String, CostMetrics>,
    prices: HashMap<String, BackendPricing>,
    store: Arc<dyn RecordStore>,
}

impl CostTracker {
    pub fn new(
        store: Arc<dyn RecordStore>,
        prices: HashMap<String, BackendPricing>,
    ) -> Result<Self, StoreError> {
        let metrics = DashMap::new();
        for (backend_id, value) in store.list_records(NAMESPACE)? {
            match serde_json::from_value::<CostMetrics>(value) {
                Ok(m) => {
                    metrics.insert(backend_id, m);
                }
                Err(e) => {
                    tracing::warn!(%backend_id, error = %e, "Discarding unreadable cost record");
                }
            }
        }
        Ok(Self {
            metrics,
            prices,
            store,
        })
    }

    /// Price one call's token usage and fold it into the backend's totals.
    ///
    /// Backends without a configured rate card accumulate tokens at zero cost.
    pub fn record_usage(&self, backend_id: &str, usage: &TokenUsage) -> Result<(), StoreError> {
        let call_cost = self
            .prices
            .get(backend_id)
            .map(|p| {
                (usage.input_tokens as f64 / 1_000_000.0) * p.input_per_million
                    + (usage.output_tokens as f64 / 1_000_000.0) * p.output_per_million
            })
            .unwrap_or(0.0);

        let mut entry = self.metrics.entry(backend_id.to_string()).or_default();
        entry.total_calls += 1;
        entry.total_input_tokens += usage.input_tokens;
        entry.total_output_tokens += usage.output_tokens;
        entry.total_cost += call_cost;

        let snapshot = entry.clone();
        let value = serde_json::to_value(&snapshot)?;
        self.store.write_record(NAMESPACE, backend_id, &value)
    }

    pub fn get_metrics(&self, backend_id: &str) -> CostMetrics {
        self.metrics
            .get(backend_id)
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn get_all_metrics(&self) -> Vec<(String, CostMetrics)> {
        let mut all: Vec<_> = self
            .metrics
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn avg_cost(&self, backend_id: &str) -> f64 {
        self.get_metrics(backend_id).avg_cost_per_call()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;

    fn prices() -> HashMap<String, BackendPricing> {
        let mut prices = HashMap::new();
        prices.insert(
            "a".to_string(),
            BackendPricing {
                input_per_million: 3.0,
                output_per_million: 15.0,
            },
        );
        prices
    }

    #[test]
    fn prices_tokens_per_million() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = CostTracker::new(Arc::new(FileStore::new(dir.path())), prices()).unwrap();

        let usage = TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 500_000,
        };
        tracker.record_usage("a", &usage).unwrap();

        // 1.0 * 3.0 + 0.5 * 15.0 = 10.50
        let metrics = tracker.get_metrics("a");
        assert!((metrics.total_cost - 10.5).abs() < 1e-9);
        assert_eq!(metrics.total_input_tokens, 1_000_000);
        assert_eq!(metrics.total_output_tokens, 500_000);
    }

    #[test]
    fn unknown_backend_costs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = CostTracker::new(Arc::new(FileStore::new(dir.path())), prices()).unwrap();

        let usage = TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 1_000_000,
        };
        tracker.record_usage("unpriced", &usage).unwrap();

        let metrics = tracker.get_metrics("unpriced");
        assert_eq!(metrics.total_cost, 0.0);
        assert_eq!(metrics.total_input_tokens, 1_000_000);
    }

    #[test]
    fn avg_cost_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = CostTracker::new(Arc::new(FileStore::new(dir.path())), prices()).unwrap();

        let usage = TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 0,
        };
        tracker.record_usage("a", &usage).unwrap();
        tracker.record_usage("a", &usage).unwrap();

        assert!((tracker.avg_cost("a") - 3.0).abs() < 1e-9);
        assert_eq!(tracker.avg_cost("never-called"), 0.0);
    }

    #[test]
    fn metrics_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 200,
        };
        {
            let tracker =
                CostTracker::new(Arc::new(FileStore::new(dir.path())), prices()).unwrap();
            tracker.record_usage("a", &usage).unwrap();
        }
        let tracker = CostTracker::new(Arc::new(FileStore::new(dir.path())), prices()).unwrap();
        assert_eq!(tracker.get_metrics("a").total_calls, 1);
    }
}
