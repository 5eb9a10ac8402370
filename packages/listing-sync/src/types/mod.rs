//! Domain types shared by every source.

pub mod config;
pub mod record;
pub mod snapshot;
