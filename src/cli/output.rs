//! Output formatting helpers for CLI commands.

use crate::backend::types::ExtractionResult;
use crate::dlq::DlqEntry;
use crate::orchestrator::ExtractionOutcome;
use crate::tracking::{CostMetrics, Health, HealthStatus, QualityMetrics};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

/// One backend's row in the metrics view.
#[derive(Debug, serde::Serialize)]
pub struct MetricsView {
    pub backend_id: String,
    pub health: HealthStatus,
    pub quality: QualityMetrics,
    pub cost: CostMetrics,
}

/// Format an extraction outcome as a field table plus a summary line.
pub fn format_outcome_table(outcome: &ExtractionOutcome) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value", "Confidence"]);

    for (name, field) in &outcome.result.fields {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(field.value.to_string()),
            Cell::new(format!("{:.2}", field.confidence)),
        ]);
    }

    let validation = if outcome.result.validation_passed {
        "passed".green().to_string()
    } else {
        "failed".red().to_string()
    };

    format!(
        "{table}\n\nBackend: {} (strategy: {}, contributors: {})\nConfidence: {:.2}  Completeness: {:.2}  Validation: {}",
        outcome.backend_id,
        outcome.strategy,
        outcome.contributors.join(", "),
        outcome.result.confidence,
        outcome.result.completeness,
        validation,
    )
}

/// Format an extraction outcome as JSON.
pub fn format_outcome_json(outcome: &ExtractionOutcome) -> String {
    let value = json!({
        "backend_id": outcome.backend_id,
        "strategy": outcome.strategy,
        "contributors": outcome.contributors,
        "result": result_json(&outcome.result),
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
}

fn result_json(result: &ExtractionResult) -> serde_json::Value {
    json!({
        "fields": result.fields,
        "confidence": result.confidence,
        "completeness": result.completeness,
        "validation_passed": result.validation_passed,
        "usage": result.usage,
    })
}

/// Format DLQ entries as a table.
pub fn format_dlq_table(entries: &[DlqEntry]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Operation", "Status", "Error", "Attempts", "Created"]);

    for entry in entries {
        table.add_row(vec![
            Cell::new(&entry.id),
            Cell::new(&entry.operation_type),
            Cell::new(entry.status.to_string()),
            Cell::new(&entry.error.kind),
            Cell::new(entry.error.attempts),
            Cell::new(entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]);
    }

    table.to_string()
}

/// Format DLQ entries as JSON.
pub fn format_dlq_json(entries: &[DlqEntry]) -> String {
    serde_json::to_string_pretty(&json!({ "entries": entries }))
        .unwrap_or_else(|_| "{}".to_string())
}

/// Format per-backend metrics as a table.
pub fn format_metrics_table(views: &[MetricsView]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Backend", "Health", "Circuit", "Success", "Latency", "Quality", "Calls", "Cost",
    ]);

    for v in views {
        let health_str = match v.health.health {
            Health::Healthy => "Healthy".green().to_string(),
            Health::Degraded => "Degraded".yellow().to_string(),
            Health::Unhealthy => "Unhealthy".red().to_string(),
        };

        table.add_row(vec![
            Cell::new(&v.backend_id),
            Cell::new(health_str),
            Cell::new(v.health.circuit_state.to_string()),
            Cell::new(format!("{:.1}%", v.health.success_rate * 100.0)),
            Cell::new(format!("{}ms", v.health.avg_latency_ms)),
            Cell::new(format!("{:.1}", v.quality.score_pct())),
            Cell::new(v.cost.total_calls),
            Cell::new(format!("${:.4}", v.cost.total_cost)),
        ]);
    }

    table.to_string()
}

/// Format per-backend metrics as JSON.
pub fn format_metrics_json(views: &[MetricsView]) -> String {
    serde_json::to_string_pretty(&json!({ "backends": views }))
        .unwrap_or_else(|_| "{}".to_string())
}
