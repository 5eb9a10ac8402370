//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::{PersistResult, PersistenceError};
use crate::traits::store::SnapshotStore;

/// In-memory snapshot store.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart. Reads and writes can be made to fail to
/// exercise the engine's persistence error handling.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Value>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a document (builder pattern).
    pub fn with_document(self, key: impl Into<String>, document: Value) -> Self {
        self.documents
            .write()
            .unwrap()
            .insert(key.into(), document);
        self
    }

    /// Get a copy of the stored document.
    pub fn document(&self, key: &str) -> Option<Value> {
        self.documents.read().unwrap().get(key).cloned()
    }

    /// Make every `load` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every `save` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self, key: &str) -> PersistResult<Option<Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(format!("read of {}", key)));
        }
        Ok(self.documents.read().unwrap().get(key).cloned())
    }

    async fn save(&self, key: &str, document: &Value) -> PersistResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(format!("write of {}", key)));
        }
        self.documents
            .write()
            .unwrap()
            .insert(key.to_string(), document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
