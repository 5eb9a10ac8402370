//! Site-specific HTML extraction used by the link-then-detail adapter.
//!
//! The engine never depends on concrete selectors; applications implement
//! [`ListingSite`] per website.

use crate::error::ParseResult;
use crate::traits::transport::FetchedPage;
use crate::types::record::Listing;

/// Number of result pages for `total` results at `page_size` per page.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Selector logic and URL scheme for one listing website.
pub trait ListingSite: Send + Sync {
    /// URL of the initial search request.
    fn search_url(&self) -> String;

    /// Number of listing pages, read from the initial search response.
    fn total_pages(&self, search: &FetchedPage) -> ParseResult<usize>;

    /// URL of 1-based listing page `page`.
    fn listing_page_url(&self, page: usize) -> String;

    /// Whether the search response is itself listing page 1.
    fn search_is_first_page(&self) -> bool {
        false
    }

    /// Whether listing pages require the session set by the search response.
    fn requires_session(&self) -> bool {
        false
    }

    /// Absolute detail-page links found on a listing page.
    fn extract_links(&self, page: &FetchedPage) -> Vec<String>;

    /// Extract one listing from its detail page.
    fn extract_listing(&self, link: &str, page: &FetchedPage) -> ParseResult<Listing>;
}
