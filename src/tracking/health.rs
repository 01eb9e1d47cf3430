//! Per-backend health tracking.
//!
//! Pure aggregation of call outcomes: counters, failure streaks, and an EMA
//! of latency. Trip logic belongs to the circuit breaker; the tracker only
//! derives a coarse health grade from the same failure streak, and persists
//! after every update so a restart keeps each backend's standing.

use super::CallOutcome;
use crate::breaker::{BreakerRegistry, CircuitState};
use crate::store::{RecordStore, StoreError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const NAMESPACE: &str = "health";

/// Coarse health grade derived from the consecutive-failure streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Persisted health metrics for one backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthMetrics {
    pub total_calls: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub consecutive_failures: u32,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub avg_latency_ms: u64,
}

impl HealthMetrics {
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 1.0;
        }
        self.total_successes as f64 / self.total_calls as f64
    }
}

/// Snapshot returned by `HealthTracker::status`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub health: Health,
    pub success_rate: f64,
    pub avg_latency_ms: u64,
    pub circuit_state: CircuitState,
    pub metrics: HealthMetrics,
}

/// Aggregates call outcomes per backend and persists every update.
pub struct HealthTracker {
    metrics: DashMap<String, HealthMetrics>,
    store: Arc<dyn RecordStore>,
    breakers: Arc<BreakerRegistry>,
    /// Mirror of the breaker's trip threshold, used to grade the streak
    failure_threshold: u32,
}

impl HealthTracker {
    /// Create a tracker, loading any previously persisted metrics.
    pub fn new(
        store: Arc<dyn RecordStore>,
        breakers: Arc<BreakerRegistry>,
        failure_threshold: u32,
    ) -> Result<Self, StoreError> {
        let metrics = DashMap::new();
        for (backend_id, value) in store.list_records(NAMESPACE)? {
            match serde_json::from_value::<HealthMetrics>(value) {
                Ok(m) => {
                    metrics.insert(backend_id, m);
                }
                Err(e) => {
                    tracing::warn!(%backend_id, error = %e, "Discarding unreadable health record");
                }
            }
        }
        Ok(Self {
            metrics,
            store,
            breakers,
            failure_threshold,
        })
    }

    /// Fold one call outcome into the backend's metrics and persist.
    ///
    /// Updates are serialized per backend id by the map's entry lock, so
    /// concurrently completing backends never tear each other's records.
    pub fn record(&self, outcome: &CallOutcome) -> Result<(), StoreError> {
        let mut entry = self.metrics.entry(outcome.backend_id.clone()).or_default();

        entry.total_calls += 1;
        if outcome.success {
            entry.total_successes += 1;
            entry.consecutive_failures = 0;
            entry.last_success = Some(Utc::now());
        } else {
            entry.total_failures += 1;
            entry.consecutive_failures += 1;
            entry.last_failure = Some(Utc::now());
        }

        // EMA with alpha = 0.2; first sample sets the initial value.
        entry.avg_latency_ms = if entry.avg_latency_ms == 0 {
            outcome.latency_ms
        } else {
            (outcome.latency_ms + 4 * entry.avg_latency_ms) / 5
        };

        metrics::counter!(
            "quorum_backend_calls_total",
            "backend" => outcome.backend_id.clone(),
            "outcome" => if outcome.success { "success" } else { "failure" },
        )
        .increment(1);

        let snapshot = entry.clone();
        self.persist(&outcome.backend_id, &snapshot)
    }

    /// Current status for one backend, or None if it has never been seen.
    pub fn status(&self, backend_id: &str) -> Option<HealthStatus> {
        let metrics = self.metrics.get(backend_id)?.clone();
        Some(self.status_of(backend_id, metrics))
    }

    /// Status snapshots for every tracked backend.
    pub fn all_statuses(&self) -> Vec<(String, HealthStatus)> {
        let mut statuses: Vec<_> = self
            .metrics
            .iter()
            .map(|e| {
                let id = e.key().clone();
                let status = self.status_of(&id, e.value().clone());
                (id, status)
            })
            .collect();
        statuses.sort_by(|a, b| a.0.cmp(&b.0));
        statuses
    }

    /// Zero a backend's metrics and close its circuit.
    pub fn reset(&self, backend_id: &str) -> Result<(), StoreError> {
        let fresh = HealthMetrics::default();
        self.metrics.insert(backend_id.to_string(), fresh.clone());
        self.breakers.reset(backend_id);
        self.persist(backend_id, &fresh)
    }

    fn status_of(&self, backend_id: &str, metrics: HealthMetrics) -> HealthStatus {
        let health = if metrics.consecutive_failures == 0 {
            Health::Healthy
        } else if metrics.consecutive_failures < self.failure_threshold {
            Health::Degraded
        } else {
            Health::Unhealthy
        };

        HealthStatus {
            health,
            success_rate: metrics.success_rate(),
            avg_latency_ms: metrics.avg_latency_ms,
            circuit_state: self.breakers.state(backend_id),
            metrics,
        }
    }

    fn persist(&self, backend_id: &str, metrics: &HealthMetrics) -> Result<(), StoreError> {
        let value = serde_json::to_value(metrics)?;
        self.store.write_record(NAMESPACE, backend_id, &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerConfig;
    use crate::store::FileStore;

    fn tracker(dir: &std::path::Path) -> HealthTracker {
        let store = Arc::new(FileStore::new(dir));
        let breakers = Arc::new(BreakerRegistry::new(BreakerConfig::default()));
        HealthTracker::new(store, breakers, 5).unwrap()
    }

    fn success(backend_id: &str, latency_ms: u64) -> CallOutcome {
        CallOutcome {
            backend_id: backend_id.to_string(),
            success: true,
            latency_ms,
            error: None,
            error_class: None,
            usage: None,
            quality: None,
        }
    }

    fn failure(backend_id: &str) -> CallOutcome {
        CallOutcome {
            backend_id: backend_id.to_string(),
            success: false,
            latency_ms: 50,
            error: Some(("timeout".into(), "Request timeout".into())),
            error_class: Some(crate::retry::ErrorClass::Transient),
            usage: None,
            quality: None,
        }
    }

    #[test]
    fn counters_and_streaks() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(dir.path());

        tracker.record(&success("a", 100)).unwrap();
        tracker.record(&failure("a")).unwrap();
        tracker.record(&failure("a")).unwrap();

        let status = tracker.status("a").unwrap();
        assert_eq!(status.metrics.total_calls, 3);
        assert_eq!(status.metrics.total_failures, 2);
        assert_eq!(status.metrics.consecutive_failures, 2);
        assert_eq!(status.health, Health::Degraded);
    }

    #[test]
    fn healthy_after_success_resets_streak() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(dir.path());

        tracker.record(&failure("a")).unwrap();
        tracker.record(&success("a", 100)).unwrap();

        let status = tracker.status("a").unwrap();
        assert_eq!(status.health, Health::Healthy);
        assert_eq!(status.metrics.consecutive_failures, 0);
    }

    #[test]
    fn unhealthy_at_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(dir.path());

        for _ in 0..5 {
            tracker.record(&failure("a")).unwrap();
        }
        assert_eq!(tracker.status("a").unwrap().health, Health::Unhealthy);
    }

    #[test]
    fn latency_ema_smooths() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(dir.path());

        tracker.record(&success("a", 100)).unwrap();
        tracker.record(&success("a", 600)).unwrap();

        // (600 + 4*100) / 5 = 200
        assert_eq!(tracker.status("a").unwrap().avg_latency_ms, 200);
    }

    #[test]
    fn metrics_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let tracker = tracker(dir.path());
            tracker.record(&success("a", 100)).unwrap();
            tracker.record(&failure("a")).unwrap();
        }

        let tracker = tracker(dir.path());
        let status = tracker.status("a").unwrap();
        assert_eq!(status.metrics.total_calls, 2);
        assert_eq!(status.metrics.consecutive_failures, 1);
    }

    #[test]
    fn reset_zeroes_and_closes_circuit() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()));
        let breakers = Arc::new(BreakerRegistry::new(BreakerConfig {
            failure_threshold: 1,
            cooldown_seconds: 60,
            success_threshold: 1,
        }));
        let tracker = HealthTracker::new(store, breakers.clone(), 1).unwrap();

        tracker.record(&failure("a")).unwrap();
        breakers.get("a").on_failure();
        assert_eq!(breakers.state("a"), CircuitState::Open);

        tracker.reset("a").unwrap();
        assert_eq!(tracker.status("a").unwrap().metrics.total_calls, 0);
        assert_eq!(breakers.state("a"), CircuitState::Closed);
    }

    #[test]
    fn unknown_backend_has_no_status() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(dir.path());
        assert!(tracker.status("nope").is_none());
    }
}
