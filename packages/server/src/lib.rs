// Vehicle listing server
//
// Serves one snapshot per listing source over HTTP, refreshing from the
// vendor sites on demand when a snapshot is stale.

pub mod config;
pub mod server;
pub mod sites;

pub use config::*;
