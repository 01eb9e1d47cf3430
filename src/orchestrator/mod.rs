//! Multi-backend orchestration.
//!
//! The orchestrator owns the enabled backends, routes each request through
//! the configured strategy, and feeds every settled call into the health,
//! quality, and cost trackers. When every candidate fails, the request is
//! parked in the dead-letter queue instead of being dropped.

pub mod consensus;
pub mod error;
pub mod strategies;

pub use error::OrchestratorError;
pub use strategies::{SelectionMode, Strategy};

use crate::backend::types::{ExtractionRequest, ExtractionResult};
use crate::backend::ExtractionBackend;
use crate::breaker::BreakerRegistry;
use crate::config::{BackendConfig, OrchestrationConfig};
use crate::dlq::{DlqManager, ErrorDetails};
use crate::retry::{RetryError, RetryPolicy};
use crate::tracking::{CallOutcome, CostTracker, HealthTracker, QualityTracker};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;

/// Operation type under which failed extractions are dead-lettered.
pub const OPERATION_EXTRACT: &str = "extract";

/// Backend id reported when a result is a consensus merge rather than a
/// single backend's answer.
pub const CONSENSUS_ID: &str = "consensus";

/// A configured backend paired with its transport.
pub struct BackendHandle {
    pub config: BackendConfig,
    pub backend: Arc<dyn ExtractionBackend>,
}

/// A completed extraction plus where it came from.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub result: ExtractionResult,
    /// Winning backend id, or `CONSENSUS_ID` for merged results
    pub backend_id: String,
    /// Every backend whose result contributed
    pub contributors: Vec<String>,
    pub strategy: Strategy,
}

pub struct Orchestrator {
    backends: Vec<BackendHandle>,
    breakers: Arc<BreakerRegistry>,
    retry: RetryPolicy,
    health: Arc<HealthTracker>,
    quality: Arc<QualityTracker>,
    cost: Arc<CostTracker>,
    dlq: Arc<DlqManager>,
    config: OrchestrationConfig,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        backends: Vec<BackendHandle>,
        breakers: Arc<BreakerRegistry>,
        retry: RetryPolicy,
        health: Arc<HealthTracker>,
        quality: Arc<QualityTracker>,
        cost: Arc<CostTracker>,
        dlq: Arc<DlqManager>,
        config: OrchestrationConfig,
    ) -> Self {
        let mut backends = backends;
        backends.sort_by_key(|h| h.config.priority);
        Self {
            backends,
            breakers,
            retry,
            health,
            quality,
            cost,
            dlq,
            config,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    fn enabled_backends(&self) -> Vec<&BackendHandle> {
        self.backends.iter().filter(|h| h.config.enabled).collect()
    }

    /// Run one extraction; on total failure the request is dead-lettered
    /// and the returned error carries the new entry's id.
    pub async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionOutcome, OrchestratorError> {
        match self.try_extract(request).await {
            Err(OrchestratorError::Exhausted {
                kind,
                message,
                attempts,
            }) => {
                let payload = serde_json::to_value(request)?;
                let dlq_id = self.dlq.enqueue(
                    &request.correlation_id,
                    OPERATION_EXTRACT,
                    payload,
                    ErrorDetails {
                        kind,
                        message,
                        trace: None,
                        attempts,
                    },
                )?;
                Err(OrchestratorError::AllBackendsFailed { dlq_id })
            }
            other => other,
        }
    }

    /// Run one extraction without dead-lettering on failure.
    ///
    /// This is the entry point for DLQ replay, which must not re-enqueue
    /// the payload it is replaying.
    pub async fn try_extract(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionOutcome, OrchestratorError> {
        let candidates = self.enabled_backends();
        if candidates.is_empty() {
            return Err(OrchestratorError::NoBackends);
        }

        let strategy = self.config.strategy;
        tracing::info!(
            correlation_id = %request.correlation_id,
            %strategy,
            backends = candidates.len(),
            "Dispatching extraction"
        );

        let outcome = match strategy {
            Strategy::Failover => self.failover(request, &candidates).await,
            Strategy::AllProviders | Strategy::Consensus | Strategy::BestMatch => {
                self.fan_out(request, &candidates, strategy).await
            }
        };

        match &outcome {
            Ok(o) => {
                metrics::counter!(
                    "quorum_extractions_total",
                    "strategy" => strategy.as_str(),
                    "outcome" => "success",
                )
                .increment(1);
                tracing::info!(
                    correlation_id = %request.correlation_id,
                    backend_id = %o.backend_id,
                    confidence = o.result.confidence,
                    "Extraction succeeded"
                );
            }
            Err(e) => {
                metrics::counter!(
                    "quorum_extractions_total",
                    "strategy" => strategy.as_str(),
                    "outcome" => "failure",
                )
                .increment(1);
                tracing::warn!(
                    correlation_id = %request.correlation_id,
                    error = %e,
                    "Extraction failed"
                );
            }
        }

        outcome
    }

    /// Try backends one at a time in priority order.
    ///
    /// A backend whose circuit is open is skipped without consuming any
    /// of its retry budget.
    async fn failover(
        &self,
        request: &ExtractionRequest,
        candidates: &[&BackendHandle],
    ) -> Result<ExtractionOutcome, OrchestratorError> {
        let mut attempts = 0u32;
        let mut last_error: Option<RetryError> = None;

        for handle in candidates {
            let (result, outcomes) = self.call_one(handle, request).await;
            attempts += outcomes.len() as u32;
            self.record_outcomes(&outcomes)?;

            match result {
                Ok(result) => {
                    let backend_id = handle.config.id.clone();
                    return Ok(ExtractionOutcome {
                        result,
                        contributors: vec![backend_id.clone()],
                        backend_id,
                        strategy: Strategy::Failover,
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        backend_id = %handle.config.id,
                        error = %e,
                        "Failing over to next backend"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(Self::exhausted(attempts, last_error))
    }

    /// Fan out to every candidate concurrently, then resolve per strategy.
    ///
    /// Each call is capped by the overall timeout individually: backends
    /// that settled in time are kept and recorded, stragglers are dropped
    /// without touching the trackers.
    async fn fan_out(
        &self,
        request: &ExtractionRequest,
        candidates: &[&BackendHandle],
        strategy: Strategy,
    ) -> Result<ExtractionOutcome, OrchestratorError> {
        let overall = self.config.overall_timeout();
        let calls = candidates
            .iter()
            .map(|handle| async move {
                (
                    handle.config.id.clone(),
                    timeout(overall, self.call_one(handle, request)).await,
                )
            })
            .collect::<Vec<_>>();

        let mut attempts = 0u32;
        let mut last_error: Option<RetryError> = None;
        let mut successes: Vec<(String, ExtractionResult)> = Vec::new();

        for (backend_id, settled) in join_all(calls).await {
            let (result, outcomes) = match settled {
                Ok(call) => call,
                Err(_) => {
                    tracing::warn!(%backend_id, "Backend exceeded overall timeout, dropped");
                    continue;
                }
            };
            attempts += outcomes.len() as u32;
            self.record_outcomes(&outcomes)?;
            match result {
                Ok(result) => successes.push((backend_id, result)),
                Err(e) => last_error = Some(e),
            }
        }

        if successes.is_empty() {
            return Err(Self::exhausted(attempts, last_error));
        }

        let contributors: Vec<String> = successes.iter().map(|(id, _)| id.clone()).collect();
        let (backend_id, result) = match strategy {
            Strategy::Consensus => self.consensus_or_fallback(successes),
            Strategy::AllProviders => self.select(successes),
            // Best-match ranks whole results by confidence averaged across
            // their fields, not by the single self-reported figure.
            Strategy::BestMatch => Self::best_mean_field_confidence(successes),
            Strategy::Failover => unreachable!("failover never fans out"),
        };

        Ok(ExtractionOutcome {
            result,
            backend_id,
            contributors,
            strategy,
        })
    }

    /// Resolve fan-out successes to one winner per the selection mode.
    fn select(&self, successes: Vec<(String, ExtractionResult)>) -> (String, ExtractionResult) {
        match self.config.selection_mode {
            SelectionMode::HighestConfidence => Self::highest_confidence(successes),
            SelectionMode::QualityBased => {
                let ids: Vec<String> = successes.iter().map(|(id, _)| id.clone()).collect();
                match self.quality.select_backend_by_quality(&ids, &self.cost) {
                    Some(winner) => {
                        let winner = winner.to_string();
                        match successes.into_iter().find(|(id, _)| *id == winner) {
                            Some(found) => found,
                            None => unreachable!("winner is drawn from the candidate list"),
                        }
                    }
                    None => unreachable!("successes is non-empty"),
                }
            }
            SelectionMode::Consensus => self.consensus_or_fallback(successes),
        }
    }

    /// Merge agreeing results when enough backends succeeded; below the
    /// agreement quorum there is nothing to vote on, so the most confident
    /// single answer wins instead.
    fn consensus_or_fallback(
        &self,
        successes: Vec<(String, ExtractionResult)>,
    ) -> (String, ExtractionResult) {
        if successes.len() >= self.config.min_agreement {
            let merged = consensus::merge_results(&successes, self.config.similarity_threshold);
            (CONSENSUS_ID.to_string(), merged)
        } else {
            tracing::debug!(
                successes = successes.len(),
                min_agreement = self.config.min_agreement,
                "Below agreement quorum, selecting by confidence"
            );
            Self::highest_confidence(successes)
        }
    }

    fn best_mean_field_confidence(
        successes: Vec<(String, ExtractionResult)>,
    ) -> (String, ExtractionResult) {
        match successes.into_iter().max_by(|a, b| {
            a.1.mean_field_confidence()
                .partial_cmp(&b.1.mean_field_confidence())
                .unwrap_or(std::cmp::Ordering::Equal)
        }) {
            Some(best) => best,
            None => unreachable!("callers check for emptiness"),
        }
    }

    fn highest_confidence(
        successes: Vec<(String, ExtractionResult)>,
    ) -> (String, ExtractionResult) {
        match successes.into_iter().max_by(|a, b| {
            a.1.confidence
                .partial_cmp(&b.1.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        }) {
            Some(best) => best,
            None => unreachable!("callers check for emptiness"),
        }
    }

    async fn call_one(
        &self,
        handle: &BackendHandle,
        request: &ExtractionRequest,
    ) -> (Result<ExtractionResult, RetryError>, Vec<CallOutcome>) {
        let breaker = self.breakers.get(&handle.config.id);
        let per_call = handle.config.timeout();
        let started = Instant::now();
        let result = self
            .retry
            .execute(
                &handle.config.id,
                handle.config.max_attempts,
                &breaker,
                || async move { handle.backend.extract(request, per_call).await },
            )
            .await;
        tracing::debug!(
            backend_id = %handle.config.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Backend call settled"
        );
        result
    }

    fn record_outcomes(&self, outcomes: &[CallOutcome]) -> Result<(), OrchestratorError> {
        for outcome in outcomes {
            self.health.record(outcome)?;
            if outcome.success {
                if let Some(usage) = &outcome.usage {
                    self.cost.record_usage(&outcome.backend_id, usage)?;
                }
                if let Some(quality) = &outcome.quality {
                    self.quality.record_extraction(&outcome.backend_id, quality)?;
                }
            }
        }
        Ok(())
    }

    fn exhausted(attempts: u32, last_error: Option<RetryError>) -> OrchestratorError {
        let (kind, message) = match last_error {
            Some(e) => (e.source_kind().to_string(), e.to_string()),
            None => ("unknown".to_string(), "no backend produced an error".to_string()),
        };
        OrchestratorError::Exhausted {
            kind,
            message,
            attempts,
        }
    }
}
