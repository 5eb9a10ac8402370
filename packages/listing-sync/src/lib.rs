//! Listing Sync Engine
//!
//! Keeps a local, timestamped snapshot of vehicle listings per remote source
//! and refreshes it only when stale. Two source shapes share one engine:
//!
//! - **Paged API**: POST a filter with an increasing offset until the
//!   announced total is collected; reconciled against the previous snapshot
//!   so listings that disappear are kept and marked `sold`.
//! - **Link then detail**: walk HTML listing pages for detail links, then
//!   scrape each detail page; the snapshot is replaced wholesale and per-item
//!   failures become sentinel records.
//!
//! # Usage
//!
//! ```rust,ignore
//! use listing_sync::{FileStore, HttpTransport, Orchestrator, PagedApiConfig, PagedApiSource};
//! use listing_sync::{RecordKey, SnapshotLayout, SourceConfig};
//!
//! let transport = Arc::new(HttpTransport::new(Duration::from_secs(30))?);
//! let store = Arc::new(FileStore::new("data"));
//!
//! let source = PagedApiSource::new(
//!     transport,
//!     SourceConfig::new("i4/new", SnapshotLayout::Statused),
//!     PagedApiConfig::new(endpoint, filter, RecordKey::new("/vehicle/vssId")),
//! );
//! let orchestrator = Orchestrator::new(source, store);
//!
//! let served = orchestrator.get().await?;
//! println!("{} records ({})", served.snapshot.len(), served.origin);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams: snapshot store, transport, source adapter, listing site
//! - [`types`] - Records, snapshots and per-source config
//! - [`pipeline`] - Staleness, reconciliation and the orchestrator
//! - [`sources`] - The two adapter shapes
//! - [`stores`] - Storage implementations (FileStore, MemoryStore)
//! - [`transports`] - reqwest transport
//! - [`testing`] - Mock transport for tests

pub mod error;
pub mod pipeline;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod transports;
pub mod types;

// Re-export core types at crate root
pub use error::{
    ParseError, ParseResult, PersistResult, PersistenceError, SyncError, SyncResult,
    TransportError,
};
pub use traits::{
    site::{page_count, ListingSite},
    source::{Harvest, SourceAdapter},
    store::SnapshotStore,
    transport::{FetchedPage, SessionToken, Transport},
};
pub use types::{
    config::{api_ttl, listing_ttl, LinkDetailConfig, PagedApiConfig, SourceConfig},
    record::{Listing, Record, RecordKey, RecordStatus, StatusedRecord},
    snapshot::{LinkCache, Snapshot, SnapshotLayout},
};

// Re-export pipeline components
pub use pipeline::{
    is_stale, reconcile, replace, Orchestrator, Reconciliation, Served, ServedBody,
    SnapshotOrigin, SnapshotSource,
};

pub use sources::{page_url, Discovery, LinkDetailSource, PagedApiSource};
pub use stores::{FileStore, MemoryStore};
pub use transports::{HttpTransport, RetryPolicy};
pub use testing::MockTransport;
