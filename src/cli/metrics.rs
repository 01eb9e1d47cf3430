//! Metrics command implementation.

use super::app::AppContext;
use super::output::{format_metrics_json, format_metrics_table, MetricsView};
use super::MetricsArgs;
use crate::tracking::{Health, HealthMetrics, HealthStatus};

/// Handle `quorum metrics`: one row per backend joining health, quality,
/// and cost, including configured backends that have never been called.
pub fn handle_metrics(
    args: &MetricsArgs,
    context: &AppContext,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut backend_ids: Vec<String> = context
        .config
        .backends
        .iter()
        .map(|b| b.id.clone())
        .collect();
    for (id, _) in context.health.all_statuses() {
        if !backend_ids.contains(&id) {
            backend_ids.push(id);
        }
    }

    let views: Vec<MetricsView> = backend_ids
        .into_iter()
        .map(|id| {
            let health = context.health.status(&id).unwrap_or_else(|| HealthStatus {
                health: Health::Healthy,
                success_rate: 1.0,
                avg_latency_ms: 0,
                circuit_state: context.breakers.state(&id),
                metrics: HealthMetrics::default(),
            });
            MetricsView {
                quality: context.quality.get_metrics(&id),
                cost: context.cost.get_metrics(&id),
                backend_id: id,
                health,
            }
        })
        .collect();

    if args.json {
        return Ok(format_metrics_json(&views));
    }
    if views.is_empty() {
        return Ok("No metrics recorded yet.".to_string());
    }
    Ok(format_metrics_table(&views))
}
