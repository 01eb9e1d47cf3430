//! Dead-letter entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle of a dead-letter entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DlqStatus {
    Pending,
    Replaying,
    Completed,
    Failed,
}

impl std::fmt::Display for DlqStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Replaying => "replaying",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// What went wrong when the operation was dead-lettered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Stable error kind tag, e.g. "timeout" or "circuit_open"
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    /// Attempts consumed before giving up
    pub attempts: u32,
}

/// A failed operation parked for later replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    pub id: String,
    pub operation_type: String,
    pub payload: Value,
    pub error: ErrorDetails,
    pub status: DlqStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replayed_at: Option<DateTime<Utc>>,
}

impl DlqEntry {
    /// Build a pending entry. The id embeds the creation timestamp so a
    /// lexicographic sort yields creation order.
    pub fn new(
        correlation_id: &str,
        operation_type: &str,
        payload: Value,
        error: ErrorDetails,
    ) -> Self {
        let created_at = Utc::now();
        let id = format!(
            "{}-{}",
            created_at.format("%Y%m%dT%H%M%S%3fZ"),
            correlation_id
        );
        Self {
            id,
            operation_type: operation_type.to_string(),
            payload,
            error,
            status: DlqStatus::Pending,
            created_at,
            replayed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_is_pending_with_sortable_id() {
        let error = ErrorDetails {
            kind: "timeout".into(),
            message: "request timed out".into(),
            trace: None,
            attempts: 3,
        };
        let entry = DlqEntry::new("req-1", "extract", serde_json::json!({"x": 1}), error);

        assert_eq!(entry.status, DlqStatus::Pending);
        assert!(entry.id.ends_with("-req-1"));
        assert!(entry.replayed_at.is_none());
    }

    #[test]
    fn status_round_trips_through_serde() {
        let json = serde_json::to_string(&DlqStatus::Replaying).unwrap();
        assert_eq!(json, "\"replaying\"");
        let back: DlqStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DlqStatus::Replaying);
    }
}
