//! Refresh pipeline.
//!
//! - [`schedule`] - TTL staleness check
//! - [`reconcile`] - Lifecycle merge (available/sold) and replacement
//! - [`orchestrator`] - Cache-or-crawl driver, one per source

pub mod orchestrator;
pub mod reconcile;
pub mod schedule;

pub use orchestrator::{Orchestrator, Served, ServedBody, SnapshotOrigin, SnapshotSource};
pub use reconcile::{reconcile, replace, Reconciliation};
pub use schedule::is_stale;
