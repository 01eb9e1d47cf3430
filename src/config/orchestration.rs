//! Orchestration strategy configuration

use crate::orchestrator::strategies::{SelectionMode, Strategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the orchestration layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Active strategy for incoming requests
    pub strategy: Strategy,
    /// How the all-providers strategy picks the final result
    pub selection_mode: SelectionMode,
    /// Minimum successful backends for a consensus merge
    pub min_agreement: usize,
    /// Text similarity above which two field values are treated as agreeing (0..1)
    pub similarity_threshold: f64,
    /// Overall fan-out deadline in seconds; late completions are discarded
    pub overall_timeout_seconds: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Failover,
            selection_mode: SelectionMode::HighestConfidence,
            min_agreement: 2,
            similarity_threshold: 0.85,
            overall_timeout_seconds: 120,
        }
    }
}

impl OrchestrationConfig {
    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OrchestrationConfig::default();
        assert_eq!(config.strategy, Strategy::Failover);
        assert_eq!(config.selection_mode, SelectionMode::HighestConfidence);
        assert_eq!(config.min_agreement, 2);
    }

    #[test]
    fn parse_from_toml() {
        let toml = r#"
        strategy = "consensus"
        selection_mode = "quality_based"
        min_agreement = 3
        similarity_threshold = 0.9
        "#;

        let config: OrchestrationConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.strategy, Strategy::Consensus);
        assert_eq!(config.selection_mode, SelectionMode::QualityBased);
        assert_eq!(config.min_agreement, 3);
        assert_eq!(config.overall_timeout_seconds, 120);
    }
}
