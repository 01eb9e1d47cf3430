//! Dead-letter queue with idempotent replay.
//!
//! Failed operations are parked as JSON records, partitioned by operation
//! type (`dlq/<operation_type>`). Replay routes each entry's payload to the
//! handler registered for its operation type; a persisted processed-id set
//! makes replaying an already-completed entry a no-op instead of a duplicate
//! side effect.

pub mod entry;

pub use entry::{DlqEntry, DlqStatus, ErrorDetails};

use crate::store::{RecordStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

const ROOT_NAMESPACE: &str = "dlq";
const PROCESSED_RECORD: &str = "processed";

/// Replays the payload of a dead-lettered operation.
#[async_trait]
pub trait ReplayHandler: Send + Sync + 'static {
    async fn replay(&self, payload: &Value) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum DlqError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    #[error("dead-letter entry not found: {0}")]
    NotFound(String),

    #[error("no replay handler registered for operation type '{0}'")]
    NoHandler(String),
}

/// Outcome counts from a batch replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub success: usize,
    pub failed: usize,
}

/// Manages dead-letter entries across operation-type partitions.
pub struct DlqManager {
    store: Arc<dyn RecordStore>,
    handlers: RwLock<HashMap<String, Arc<dyn ReplayHandler>>>,
    /// Ids that completed replay, persisted so restarts stay idempotent
    processed: Mutex<HashSet<String>>,
}

impl DlqManager {
    /// Create a manager, loading the persisted processed-id set.
    pub fn new(store: Arc<dyn RecordStore>) -> Result<Self, DlqError> {
        let processed = match store.read_record(ROOT_NAMESPACE, PROCESSED_RECORD)? {
            Some(value) => serde_json::from_value(value)?,
            None => HashSet::new(),
        };
        Ok(Self {
            store,
            handlers: RwLock::new(HashMap::new()),
            processed: Mutex::new(processed),
        })
    }

    /// Register the replay handler for an operation type.
    pub fn register_handler(&self, operation_type: &str, handler: Arc<dyn ReplayHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation_type.to_string(), handler);
    }

    /// Park a failed operation. Returns the new entry's id.
    ///
    /// A write failure here propagates: a payload that cannot be parked is
    /// lost, and the caller must hear about it.
    pub fn enqueue(
        &self,
        correlation_id: &str,
        operation_type: &str,
        payload: Value,
        error: ErrorDetails,
    ) -> Result<String, DlqError> {
        let entry = DlqEntry::new(correlation_id, operation_type, payload, error);
        self.persist(&entry)?;
        tracing::warn!(
            id = %entry.id,
            operation_type,
            kind = %entry.error.kind,
            "Operation dead-lettered"
        );
        metrics::counter!("quorum_dlq_enqueued_total", "operation_type" => operation_type.to_string())
            .increment(1);
        Ok(entry.id)
    }

    /// Find an entry by id across all partitions.
    pub fn get(&self, id: &str) -> Result<Option<DlqEntry>, DlqError> {
        for partition in self.store.list_namespaces(ROOT_NAMESPACE)? {
            let namespace = format!("{ROOT_NAMESPACE}/{partition}");
            if let Some(value) = self.store.read_record(&namespace, id)? {
                return Ok(Some(serde_json::from_value(value)?));
            }
        }
        Ok(None)
    }

    /// Pending entries, oldest first, optionally limited to one partition.
    pub fn list_pending(&self, operation_type: Option<&str>) -> Result<Vec<DlqEntry>, DlqError> {
        let partitions = match operation_type {
            Some(op) => vec![op.to_string()],
            None => self.store.list_namespaces(ROOT_NAMESPACE)?,
        };

        let mut pending = Vec::new();
        for partition in partitions {
            let namespace = format!("{ROOT_NAMESPACE}/{partition}");
            for (_, value) in self.store.list_records(&namespace)? {
                let entry: DlqEntry = match serde_json::from_value(value) {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!(%partition, error = %e, "Skipping unreadable DLQ record");
                        continue;
                    }
                };
                if entry.status == DlqStatus::Pending {
                    pending.push(entry);
                }
            }
        }
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }

    /// Replay one entry through its registered handler.
    ///
    /// Returns Ok(true) when the handler succeeded, Ok(false) when the entry
    /// was already processed or the handler failed (the entry is marked
    /// Failed and kept for another attempt).
    pub async fn replay(&self, id: &str) -> Result<bool, DlqError> {
        if self.is_processed(id) {
            tracing::info!(id, "Entry already processed, skipping replay");
            return Ok(false);
        }

        let mut entry = self.get(id)?.ok_or_else(|| DlqError::NotFound(id.to_string()))?;
        let handler = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            handlers
                .get(&entry.operation_type)
                .cloned()
                .ok_or_else(|| DlqError::NoHandler(entry.operation_type.clone()))?
        };

        entry.status = DlqStatus::Replaying;
        entry.replayed_at = Some(Utc::now());
        self.persist(&entry)?;

        match handler.replay(&entry.payload).await {
            Ok(()) => {
                entry.status = DlqStatus::Completed;
                self.persist(&entry)?;
                self.mark_processed(id)?;
                tracing::info!(id, operation_type = %entry.operation_type, "Replay completed");
                metrics::counter!("quorum_dlq_replays_total", "outcome" => "success").increment(1);
                Ok(true)
            }
            Err(e) => {
                entry.status = DlqStatus::Failed;
                self.persist(&entry)?;
                tracing::warn!(id, error = %e, "Replay failed, entry kept for retry");
                metrics::counter!("quorum_dlq_replays_total", "outcome" => "failure").increment(1);
                Ok(false)
            }
        }
    }

    /// Replay up to `max` pending entries of one operation type, oldest first.
    pub async fn replay_batch(
        &self,
        operation_type: &str,
        max: usize,
    ) -> Result<ReplayStats, DlqError> {
        let mut stats = ReplayStats::default();
        for entry in self.list_pending(Some(operation_type))?.into_iter().take(max) {
            if self.replay(&entry.id).await? {
                stats.success += 1;
            } else {
                stats.failed += 1;
            }
        }
        Ok(stats)
    }

    /// Mark an entry resolved without replaying it.
    ///
    /// Returns Ok(false) if it was already processed.
    pub fn mark_completed(&self, id: &str) -> Result<bool, DlqError> {
        if self.is_processed(id) {
            return Ok(false);
        }
        let mut entry = self.get(id)?.ok_or_else(|| DlqError::NotFound(id.to_string()))?;
        entry.status = DlqStatus::Completed;
        self.persist(&entry)?;
        self.mark_processed(id)?;
        Ok(true)
    }

    pub fn is_processed(&self, id: &str) -> bool {
        self.processed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    fn mark_processed(&self, id: &str) -> Result<(), DlqError> {
        let snapshot = {
            let mut processed = self
                .processed
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            processed.insert(id.to_string());
            processed.iter().cloned().collect::<Vec<_>>()
        };
        let value = serde_json::to_value(snapshot)?;
        self.store
            .write_record(ROOT_NAMESPACE, PROCESSED_RECORD, &value)?;
        Ok(())
    }

    fn persist(&self, entry: &DlqEntry) -> Result<(), DlqError> {
        let namespace = format!("{ROOT_NAMESPACE}/{}", entry.operation_type);
        let value = serde_json::to_value(entry)?;
        self.store.write_record(&namespace, &entry.id, &value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingHandler {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl ReplayHandler for CountingHandler {
        async fn replay(&self, _payload: &Value) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("handler rejected payload");
            }
            Ok(())
        }
    }

    fn error_details() -> ErrorDetails {
        ErrorDetails {
            kind: "timeout".into(),
            message: "request timed out".into(),
            trace: None,
            attempts: 3,
        }
    }

    fn manager(dir: &std::path::Path) -> DlqManager {
        DlqManager::new(Arc::new(FileStore::new(dir))).unwrap()
    }

    #[test]
    fn enqueue_creates_pending_entry() {
        let dir = tempfile::tempdir().unwrap();
        let dlq = manager(dir.path());

        let id = dlq
            .enqueue("req-1", "extract", serde_json::json!({"x": 1}), error_details())
            .unwrap();

        let entry = dlq.get(&id).unwrap().unwrap();
        assert_eq!(entry.status, DlqStatus::Pending);
        assert_eq!(entry.operation_type, "extract");
        assert_eq!(dlq.list_pending(None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replay_without_handler_errors() {
        let dir = tempfile::tempdir().unwrap();
        let dlq = manager(dir.path());
        let id = dlq
            .enqueue("req-1", "extract", Value::Null, error_details())
            .unwrap();

        let err = dlq.replay(&id).await.unwrap_err();
        assert!(matches!(err, DlqError::NoHandler(op) if op == "extract"));
    }

    #[tokio::test]
    async fn replay_success_completes_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let dlq = manager(dir.path());
        let handler = CountingHandler::new(false);
        dlq.register_handler("extract", handler.clone());

        let id = dlq
            .enqueue("req-1", "extract", Value::Null, error_details())
            .unwrap();

        assert!(dlq.replay(&id).await.unwrap());
        assert_eq!(dlq.get(&id).unwrap().unwrap().status, DlqStatus::Completed);

        // Second replay must not reach the handler again.
        assert!(!dlq.replay(&id).await.unwrap());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn replay_failure_marks_failed_and_keeps_entry() {
        let dir = tempfile::tempdir().unwrap();
        let dlq = manager(dir.path());
        dlq.register_handler("extract", CountingHandler::new(true));

        let id = dlq
            .enqueue("req-1", "extract", Value::Null, error_details())
            .unwrap();

        assert!(!dlq.replay(&id).await.unwrap());
        let entry = dlq.get(&id).unwrap().unwrap();
        assert_eq!(entry.status, DlqStatus::Failed);
        assert!(!dlq.is_processed(&id));
    }

    #[tokio::test]
    async fn processed_set_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let dlq = manager(dir.path());
            dlq.register_handler("extract", CountingHandler::new(false));
            let id = dlq
                .enqueue("req-1", "extract", Value::Null, error_details())
                .unwrap();
            assert!(dlq.replay(&id).await.unwrap());
            id
        };

        let dlq = manager(dir.path());
        let handler = CountingHandler::new(false);
        dlq.register_handler("extract", handler.clone());
        assert!(!dlq.replay(&id).await.unwrap());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn mark_completed_resolves_without_replay() {
        let dir = tempfile::tempdir().unwrap();
        let dlq = manager(dir.path());
        let id = dlq
            .enqueue("req-1", "extract", Value::Null, error_details())
            .unwrap();

        assert!(dlq.mark_completed(&id).unwrap());
        assert!(dlq.is_processed(&id));
        assert!(!dlq.mark_completed(&id).unwrap());
        assert!(dlq.list_pending(None).unwrap().is_empty());
    }

    #[test]
    fn list_pending_filters_by_operation_type() {
        let dir = tempfile::tempdir().unwrap();
        let dlq = manager(dir.path());
        dlq.enqueue("req-1", "extract", Value::Null, error_details())
            .unwrap();
        dlq.enqueue("req-2", "persist", Value::Null, error_details())
            .unwrap();

        let extract_only = dlq.list_pending(Some("extract")).unwrap();
        assert_eq!(extract_only.len(), 1);
        assert_eq!(extract_only[0].operation_type, "extract");
        assert_eq!(dlq.list_pending(None).unwrap().len(), 2);
    }
}
