//! Source adapters.
//!
//! - `PagedApiSource` - Paged JSON search API, all-or-nothing, lifecycle merge
//! - `LinkDetailSource` - HTML listing pages then detail pages, degrades, replacement merge

pub mod link_detail;
pub mod paged_api;

pub use link_detail::{Discovery, LinkDetailSource};
pub use paged_api::{page_url, PagedApiSource};
