//! Shared wiring for CLI commands: build the full orchestration stack from
//! a loaded configuration.

use crate::backend::factory::build_backends;
use crate::backend::types::ExtractionRequest;
use crate::breaker::BreakerRegistry;
use crate::config::QuorumConfig;
use crate::dlq::{DlqManager, ReplayHandler};
use crate::orchestrator::{BackendHandle, Orchestrator, OPERATION_EXTRACT};
use crate::retry::RetryPolicy;
use crate::store::FileStore;
use crate::tracking::{CostTracker, HealthTracker, QualityTracker};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Every long-lived component a command might need.
pub struct AppContext {
    pub config: QuorumConfig,
    pub breakers: Arc<BreakerRegistry>,
    pub health: Arc<HealthTracker>,
    pub quality: Arc<QualityTracker>,
    pub cost: Arc<CostTracker>,
    pub dlq: Arc<DlqManager>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppContext {
    /// Wire up trackers, DLQ, and orchestrator from a validated config.
    pub fn build(config: QuorumConfig) -> anyhow::Result<Self> {
        let store = Arc::new(FileStore::new(&config.storage.data_dir));
        let breakers = Arc::new(BreakerRegistry::new(config.breaker));

        let health = Arc::new(HealthTracker::new(
            store.clone(),
            breakers.clone(),
            config.breaker.failure_threshold,
        )?);
        let quality = Arc::new(QualityTracker::new(store.clone())?);

        let prices: HashMap<_, _> = config
            .backends
            .iter()
            .map(|b| (b.id.clone(), b.pricing))
            .collect();
        let cost = Arc::new(CostTracker::new(store.clone(), prices)?);

        let dlq = Arc::new(DlqManager::new(store)?);

        let backends = build_backends(&config.backends)?
            .into_iter()
            .map(|(config, backend)| BackendHandle { config, backend })
            .collect();

        let orchestrator = Arc::new(Orchestrator::new(
            backends,
            breakers.clone(),
            RetryPolicy::new(config.retry),
            health.clone(),
            quality.clone(),
            cost.clone(),
            dlq.clone(),
            config.orchestration.clone(),
        ));

        dlq.register_handler(
            OPERATION_EXTRACT,
            Arc::new(ExtractReplayHandler {
                orchestrator: orchestrator.clone(),
            }),
        );

        Ok(Self {
            config,
            breakers,
            health,
            quality,
            cost,
            dlq,
            orchestrator,
        })
    }
}

/// Replays a dead-lettered extraction through the orchestrator.
///
/// Uses `try_extract` so a replay that fails again does not enqueue a
/// duplicate entry; the original stays in the queue marked failed.
pub struct ExtractReplayHandler {
    pub orchestrator: Arc<Orchestrator>,
}

#[async_trait]
impl ReplayHandler for ExtractReplayHandler {
    async fn replay(&self, payload: &Value) -> anyhow::Result<()> {
        let request: ExtractionRequest = serde_json::from_value(payload.clone())?;
        self.orchestrator.try_extract(&request).await?;
        Ok(())
    }
}
