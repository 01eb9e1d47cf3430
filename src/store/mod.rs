//! Durable record storage.
//!
//! One JSON record per (namespace, name). Writes are atomic: the record is
//! written to a temp file and renamed over the old one, so a crash mid-write
//! never corrupts the previous valid state. The trackers and the dead-letter
//! queue all persist through this interface.

mod error;

pub use error::StoreError;

use std::fs;
use std::path::{Path, PathBuf};

/// Read/write named JSON records under namespaces, with atomic replace.
pub trait RecordStore: Send + Sync + 'static {
    fn write_record(
        &self,
        namespace: &str,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<(), StoreError>;

    fn read_record(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<serde_json::Value>, StoreError>;

    /// All records in a namespace as (name, value) pairs, unordered.
    fn list_records(&self, namespace: &str) -> Result<Vec<(String, serde_json::Value)>, StoreError>;

    /// Child namespaces directly under `namespace` (e.g. DLQ partitions).
    fn list_namespaces(&self, namespace: &str) -> Result<Vec<String>, StoreError>;
}

/// Filesystem-backed record store: `<root>/<namespace>/<name>.json`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, namespace: &str, name: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{}.json", name))
    }

    fn io_err(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl RecordStore for FileStore {
    fn write_record(
        &self,
        namespace: &str,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir).map_err(|e| Self::io_err(&dir, e))?;

        let path = self.record_path(namespace, name);
        let tmp = dir.join(format!(".{}.json.tmp", name));
        let bytes = serde_json::to_vec_pretty(value)?;

        fs::write(&tmp, bytes).map_err(|e| Self::io_err(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| Self::io_err(&path, e))?;
        Ok(())
    }

    fn read_record(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        let path = self.record_path(namespace, name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_err(&path, e)),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn list_records(
        &self,
        namespace: &str,
    ) -> Result<Vec<(String, serde_json::Value)>, StoreError> {
        let dir = self.root.join(namespace);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_err(&dir, e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Self::io_err(&dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };
            if name.starts_with('.') {
                // leftover temp file from an interrupted write
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|e| Self::io_err(&path, e))?;
            records.push((name.to_string(), serde_json::from_str(&content)?));
        }
        Ok(records)
    }

    fn list_namespaces(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join(namespace);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_err(&dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Self::io_err(&dir, e))?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
