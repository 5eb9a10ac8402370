//! Per-source configuration.

use chrono::Duration;
use serde_json::Value;

use super::record::RecordKey;
use super::snapshot::SnapshotLayout;

/// One hour, the refresh interval for paged-API sources.
pub fn api_ttl() -> Duration {
    Duration::hours(1)
}

/// One day, the refresh interval for both link-source caches.
pub fn listing_ttl() -> Duration {
    Duration::hours(24)
}

/// What every source needs regardless of adapter shape.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Name used in logs and as the route key (e.g. "i5/new")
    pub name: String,

    /// Storage key for the snapshot document
    pub storage_key: String,

    /// Snapshot time-to-live; zero means always refresh
    pub ttl: Duration,

    /// On-disk and response layout
    pub layout: SnapshotLayout,
}

impl SourceConfig {
    /// Create a config whose storage key equals its name.
    pub fn new(name: impl Into<String>, layout: SnapshotLayout) -> Self {
        let name = name.into();
        let ttl = match layout {
            SnapshotLayout::Statused => api_ttl(),
            SnapshotLayout::Listing => listing_ttl(),
        };
        Self {
            storage_key: name.clone(),
            name,
            ttl,
            layout,
        }
    }

    /// Set the time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set a storage key different from the name.
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }
}

/// Paged JSON search API settings.
#[derive(Debug, Clone)]
pub struct PagedApiConfig {
    /// Endpoint URL; may already carry query parameters
    pub endpoint: String,

    /// JSON body posted with every page request
    pub filter: Value,

    /// Query parameter carrying the offset
    pub offset_param: String,

    /// Where the vendor id lives inside each hit
    pub key: RecordKey,

    /// Sleep between page requests
    pub page_delay: std::time::Duration,
}

impl PagedApiConfig {
    pub fn new(endpoint: impl Into<String>, filter: Value, key: RecordKey) -> Self {
        Self {
            endpoint: endpoint.into(),
            filter,
            offset_param: "startIndex".to_string(),
            key,
            page_delay: std::time::Duration::ZERO,
        }
    }

    /// Set the offset query parameter name.
    pub fn with_offset_param(mut self, param: impl Into<String>) -> Self {
        self.offset_param = param.into();
        self
    }

    /// Set the polite delay between page requests.
    pub fn with_page_delay(mut self, delay: std::time::Duration) -> Self {
        self.page_delay = delay;
        self
    }
}

/// Link-then-detail settings.
#[derive(Debug, Clone)]
pub struct LinkDetailConfig {
    /// Storage key for the link cache
    pub link_cache_key: String,

    /// Link cache time-to-live
    pub link_ttl: Duration,

    /// Maximum detail pages fetched at once
    pub detail_concurrency: usize,

    /// Sleep between listing page requests during discovery
    pub page_delay: std::time::Duration,
}

impl LinkDetailConfig {
    pub fn new(link_cache_key: impl Into<String>) -> Self {
        Self {
            link_cache_key: link_cache_key.into(),
            link_ttl: listing_ttl(),
            detail_concurrency: 4,
            page_delay: std::time::Duration::ZERO,
        }
    }

    /// Set the link cache time-to-live.
    pub fn with_link_ttl(mut self, ttl: Duration) -> Self {
        self.link_ttl = ttl;
        self
    }

    /// Set the detail worker pool size (at least 1).
    pub fn with_detail_concurrency(mut self, concurrency: usize) -> Self {
        self.detail_concurrency = concurrency.max(1);
        self
    }

    /// Set the polite delay between listing page requests.
    pub fn with_page_delay(mut self, delay: std::time::Duration) -> Self {
        self.page_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_defaults_by_layout() {
        let api = SourceConfig::new("i4/new", SnapshotLayout::Statused);
        let listing = SourceConfig::new("i5/used", SnapshotLayout::Listing);

        assert_eq!(api.ttl, Duration::hours(1));
        assert_eq!(listing.ttl, Duration::hours(24));
        assert_eq!(api.storage_key, "i4/new");
    }

    #[test]
    fn test_detail_concurrency_floor() {
        let config = LinkDetailConfig::new("links").with_detail_concurrency(0);
        assert_eq!(config.detail_concurrency, 1);
    }
}
