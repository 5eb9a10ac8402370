//! Snapshot storage: a whole-document blob store keyed by source.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::PersistResult;

/// Durable storage for snapshot documents.
///
/// Reads and writes are whole-document. A `save` must be atomic: a
/// concurrent or later `load` sees either the previous document or the new
/// one, never a partial write.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the document stored under `key`, or `None` if there is none.
    async fn load(&self, key: &str) -> PersistResult<Option<Value>>;

    /// Replace the document stored under `key`.
    async fn save(&self, key: &str, document: &Value) -> PersistResult<()>;

    /// Get the store name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<S: SnapshotStore + ?Sized> SnapshotStore for Arc<S> {
    async fn load(&self, key: &str) -> PersistResult<Option<Value>> {
        (**self).load(key).await
    }

    async fn save(&self, key: &str, document: &Value) -> PersistResult<()> {
        (**self).save(key, document).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
