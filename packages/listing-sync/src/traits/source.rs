//! Source adapter capability interface.
//!
//! An adapter knows how to harvest a fresh batch from one remote source and
//! how to merge that batch into the previous snapshot. The orchestrator owns
//! everything else (staleness, persistence, serialization of crawls).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SyncResult;
use crate::types::config::SourceConfig;

/// Outcome of one harvest.
#[derive(Debug, Clone)]
pub struct Harvest<T> {
    /// Items in source order
    pub items: Vec<T>,

    /// Some pages or items failed and were skipped or replaced by sentinels
    pub degraded: bool,

    /// Whether the merged result should be written to the store
    pub persist: bool,
}

impl<T> Harvest<T> {
    /// Every page and item was fetched.
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            degraded: false,
            persist: true,
        }
    }

    /// Some failures were tolerated; the result is still persisted.
    pub fn partial(items: Vec<T>) -> Self {
        Self {
            items,
            degraded: true,
            persist: true,
        }
    }

    /// Nothing usable was collected; answer the caller but keep the store untouched.
    pub fn failed() -> Self {
        Self {
            items: Vec::new(),
            degraded: true,
            persist: false,
        }
    }
}

/// A remote source the orchestrator can refresh.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Record type stored in this source's snapshot.
    type Entry: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Item type produced by a harvest.
    type Item: Send + 'static;

    /// Name, storage key, TTL and layout.
    fn config(&self) -> &SourceConfig;

    /// Fetch a fresh batch. Returning `Err` aborts the refresh and reaches
    /// the caller; adapters that degrade instead return a partial harvest.
    async fn harvest(&self) -> SyncResult<Harvest<Self::Item>>;

    /// Merge the fresh batch into the previous snapshot's records.
    fn merge(&self, previous: Vec<Self::Entry>, fresh: Vec<Self::Item>) -> Vec<Self::Entry>;
}
