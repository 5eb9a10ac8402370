//! Crawl orchestration: serve from cache, or refresh and persist.
//!
//! ```text
//! get()
//!   load previous ──► fresh? ──yes──► Cached
//!        │               │
//!        │               no
//!        ▼               ▼
//!   lock source ──► re-check ──► harvest ──► merge ──► save ──► Refreshed | Degraded
//! ```
//!
//! A caller that waited on the lock while another crawl finished is handed
//! that crawl's snapshot, whatever the TTL.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::schedule::is_stale;
use crate::error::SyncResult;
use crate::traits::source::SourceAdapter;
use crate::traits::store::SnapshotStore;
use crate::types::config::SourceConfig;
use crate::types::snapshot::Snapshot;

/// Which path produced a served snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// Stored snapshot within TTL, no network I/O
    Cached,
    /// Fresh crawl, every page and item succeeded
    Refreshed,
    /// Fresh crawl with tolerated failures (partial or empty result)
    Degraded,
}

impl SnapshotOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotOrigin::Cached => "cached",
            SnapshotOrigin::Refreshed => "refreshed",
            SnapshotOrigin::Degraded => "degraded",
        }
    }
}

impl fmt::Display for SnapshotOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot together with how it was obtained.
#[derive(Debug, Clone)]
pub struct Served<R> {
    pub snapshot: Snapshot<R>,
    pub origin: SnapshotOrigin,
}

/// A served snapshot already encoded as its response body.
#[derive(Debug, Clone)]
pub struct ServedBody {
    pub body: Value,
    pub origin: SnapshotOrigin,
    pub records: usize,
}

/// Drives one source: staleness check, crawl, merge, persist.
pub struct Orchestrator<A: SourceAdapter> {
    adapter: A,
    store: Arc<dyn SnapshotStore>,
    /// Completed crawls; bumped while `last_crawl` is held
    generation: AtomicU64,
    /// Serializes crawls and keeps the most recent result
    last_crawl: Mutex<Option<Snapshot<A::Entry>>>,
}

impl<A: SourceAdapter> Orchestrator<A> {
    pub fn new(adapter: A, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            adapter,
            store,
            generation: AtomicU64::new(0),
            last_crawl: Mutex::new(None),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn config(&self) -> &SourceConfig {
        self.adapter.config()
    }

    /// Return the current snapshot, refreshing it first when stale or absent.
    ///
    /// Errors only when the adapter's harvest fails; storage failures are
    /// logged and never reach the caller.
    pub async fn get(&self) -> SyncResult<Served<A::Entry>> {
        let seen = self.generation.load(Ordering::SeqCst);

        if let Some(snapshot) = self.load_previous().await {
            if self.is_fresh(&snapshot) {
                return Ok(cached(snapshot));
            }
        }

        let mut last_crawl = self.last_crawl.lock().await;

        if self.generation.load(Ordering::SeqCst) != seen {
            if let Some(snapshot) = last_crawl.as_ref() {
                debug!(source = %self.config().name, "Serving crawl that finished while waiting");
                return Ok(cached(snapshot.clone()));
            }
        }

        // another caller may have refreshed while we waited
        let previous = match self.load_previous().await {
            Some(snapshot) if self.is_fresh(&snapshot) => return Ok(cached(snapshot)),
            Some(snapshot) => snapshot.records,
            None => Vec::new(),
        };

        let served = self.refresh(previous).await?;
        *last_crawl = Some(served.snapshot.clone());
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(served)
    }

    async fn refresh(&self, previous: Vec<A::Entry>) -> SyncResult<Served<A::Entry>> {
        let config = self.config();
        let started_at = Utc::now();

        info!(source = %config.name, previous = previous.len(), "Refreshing snapshot");

        let harvest = self.adapter.harvest().await.inspect_err(|e| {
            warn!(source = %config.name, error = %e, "Crawl failed");
        })?;

        let degraded = harvest.degraded;
        let persist = harvest.persist;
        let records = self.adapter.merge(previous, harvest.items);
        let snapshot = Snapshot::new(records, started_at);

        if persist {
            self.persist(&snapshot).await;
        } else {
            debug!(source = %config.name, "Harvest marked not persistable, keeping stored snapshot");
        }

        let origin = if degraded {
            SnapshotOrigin::Degraded
        } else {
            SnapshotOrigin::Refreshed
        };

        info!(
            source = %config.name,
            records = snapshot.len(),
            origin = %origin,
            elapsed_ms = (Utc::now() - started_at).num_milliseconds(),
            "Snapshot refreshed"
        );

        Ok(Served { snapshot, origin })
    }

    /// Read the stored snapshot. Unreadable or corrupt documents count as absent.
    async fn load_previous(&self) -> Option<Snapshot<A::Entry>> {
        let config = self.config();
        let document = match self.store.load(&config.storage_key).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                debug!(source = %config.name, "No stored snapshot");
                return None;
            }
            Err(e) => {
                warn!(source = %config.name, error = %e, "Failed to read snapshot, treating as absent");
                return None;
            }
        };

        match Snapshot::from_document(&config.storage_key, document, config.layout) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(source = %config.name, error = %e, "Stored snapshot unreadable, treating as absent");
                None
            }
        }
    }

    fn is_fresh(&self, snapshot: &Snapshot<A::Entry>) -> bool {
        let config = self.config();
        if is_stale(snapshot.retrieved_at, config.ttl, Utc::now()) {
            return false;
        }
        debug!(source = %config.name, records = snapshot.len(), "Serving cached snapshot");
        true
    }

    async fn persist(&self, snapshot: &Snapshot<A::Entry>) {
        let config = self.config();
        let document = match snapshot.to_document(config.layout) {
            Ok(document) => document,
            Err(e) => {
                warn!(source = %config.name, error = %e, "Failed to encode snapshot");
                return;
            }
        };

        if let Err(e) = self.store.save(&config.storage_key, &document).await {
            warn!(source = %config.name, store = self.store.name(), error = %e, "Failed to write snapshot");
        }
    }
}

fn cached<R>(snapshot: Snapshot<R>) -> Served<R> {
    Served {
        snapshot,
        origin: SnapshotOrigin::Cached,
    }
}

/// Object-safe view of an orchestrated source, for routing by key.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    fn config(&self) -> &SourceConfig;

    /// Serve the snapshot encoded as its HTTP response body.
    async fn serve(&self) -> SyncResult<ServedBody>;
}

#[async_trait]
impl<A: SourceAdapter + 'static> SnapshotSource for Orchestrator<A> {
    fn config(&self) -> &SourceConfig {
        self.adapter.config()
    }

    async fn serve(&self) -> SyncResult<ServedBody> {
        let served = self.get().await?;
        let body = served.snapshot.to_response(self.config().layout)?;
        Ok(ServedBody {
            body,
            origin: served.origin,
            records: served.snapshot.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SyncError, TransportError};
    use crate::stores::MemoryStore;
    use crate::traits::source::Harvest;
    use crate::types::record::Listing;
    use crate::types::snapshot::SnapshotLayout;
    use chrono::Duration;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAdapter {
        config: SourceConfig,
        harvests: AtomicUsize,
        fail: bool,
    }

    impl CountingAdapter {
        fn new() -> Self {
            Self {
                config: SourceConfig::new("test/used", SnapshotLayout::Listing),
                harvests: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for CountingAdapter {
        type Entry = Listing;
        type Item = Listing;

        fn config(&self) -> &SourceConfig {
            &self.config
        }

        async fn harvest(&self) -> SyncResult<Harvest<Listing>> {
            let n = self.harvests.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            if self.fail {
                return Err(TransportError::Timeout { url: "https://x".into() }.into());
            }
            Ok(Harvest::complete(vec![Listing::sentinel(format!("https://x/{}", n))]))
        }

        fn merge(&self, _previous: Vec<Listing>, fresh: Vec<Listing>) -> Vec<Listing> {
            fresh
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_crawl() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = Arc::new(Orchestrator::new(CountingAdapter::new(), store.clone()));

        let (a, b) = tokio::join!(orchestrator.get(), orchestrator.get());

        assert_eq!(orchestrator.adapter().harvests.load(Ordering::SeqCst), 1);
        let origins = [a.unwrap().origin, b.unwrap().origin];
        assert!(origins.contains(&SnapshotOrigin::Refreshed));
        assert!(origins.contains(&SnapshotOrigin::Cached));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_waiters_share_one_crawl() {
        let mut adapter = CountingAdapter::new();
        adapter.config = adapter.config.with_ttl(Duration::zero());
        let store = Arc::new(MemoryStore::new());
        let orchestrator = Arc::new(Orchestrator::new(adapter, store.clone()));

        let (a, b, c) = tokio::join!(orchestrator.get(), orchestrator.get(), orchestrator.get());

        assert_eq!(orchestrator.adapter().harvests.load(Ordering::SeqCst), 1);
        let served = [a.unwrap(), b.unwrap(), c.unwrap()];
        let refreshed = served
            .iter()
            .filter(|s| s.origin == SnapshotOrigin::Refreshed)
            .count();
        assert_eq!(refreshed, 1);
        for s in &served {
            assert_eq!(s.snapshot.records[0].link.as_deref(), Some("https://x/0"));
        }
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_later_caller_crawls_again() {
        let mut adapter = CountingAdapter::new();
        adapter.config = adapter.config.with_ttl(Duration::zero());
        let orchestrator = Orchestrator::new(adapter, Arc::new(MemoryStore::new()));

        orchestrator.get().await.unwrap();
        let second = orchestrator.get().await.unwrap();

        assert_eq!(orchestrator.adapter().harvests.load(Ordering::SeqCst), 2);
        assert_eq!(second.origin, SnapshotOrigin::Refreshed);
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_refreshed() {
        let old = (Utc::now() - Duration::hours(25)).timestamp_millis();
        let store = Arc::new(
            MemoryStore::new().with_document("test/used", json!({ "cars": [], "timestamp": old })),
        );
        let orchestrator = Orchestrator::new(CountingAdapter::new(), store.clone());

        let served = orchestrator.get().await.unwrap();

        assert_eq!(served.origin, SnapshotOrigin::Refreshed);
        assert_eq!(served.snapshot.len(), 1);
        assert_eq!(store.document("test/used").unwrap()["cars"][0]["link"], json!("https://x/0"));
    }

    #[tokio::test]
    async fn test_harvest_error_propagates_and_keeps_store() {
        let mut adapter = CountingAdapter::new();
        adapter.fail = true;
        let store = Arc::new(MemoryStore::new());
        let orchestrator = Orchestrator::new(adapter, store.clone());

        let result = orchestrator.get().await;

        assert!(matches!(result, Err(SyncError::Transport(_))));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_serve_encodes_listing_layout_as_array() {
        let orchestrator = Orchestrator::new(CountingAdapter::new(), Arc::new(MemoryStore::new()));

        let served = orchestrator.serve().await.unwrap();

        assert!(served.body.is_array());
        assert_eq!(served.records, 1);
    }
}
