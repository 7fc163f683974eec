//! Durable state-record storage

pub mod fs;
pub mod layout;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use thiserror::Error;

pub use fs::FsStateStore;
pub use layout::Workspace;

/// Error types for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Thin durable-storage contract over named state records
///
/// Keys are flat names; hierarchical grouping is expressed through key
/// prefixes so that purging a step's records is a single prefix deletion.
/// `write` is an atomic overwrite: a reader never observes a partially
/// written record.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a record, `None` when the key does not exist
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write or atomically overwrite a record
    async fn write(&self, key: &str, record: &Value) -> Result<(), StoreError>;

    /// Delete every record whose key starts with `prefix`, returning the
    /// number of records removed
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StoreError>;

    /// Check whether a record exists
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// List keys starting with `prefix`, sorted
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// In-memory store for tests
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn write(&self, key: &str, record: &Value) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let mut records = self.records.lock().unwrap();
        let keys: Vec<String> = records
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &keys {
            records.remove(key);
        }
        Ok(keys.len())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.records.lock().unwrap().contains_key(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
