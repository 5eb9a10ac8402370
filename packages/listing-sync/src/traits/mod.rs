//! Core trait abstractions.
//!
//! These define the seams applications implement or substitute: storage,
//! network transport, source adapters and per-site HTML extraction.

pub mod site;
pub mod source;
pub mod store;
pub mod transport;
