//! Link-then-detail adapter for HTML listing sites.
//!
//! Discovery walks the site's listing pages and collects detail links (cached
//! separately under their own TTL); each link is then fetched and extracted.
//! Failures degrade instead of aborting: a failed listing page is skipped, a
//! failed detail page becomes a sentinel record.

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use indexmap::IndexSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{SyncResult, TransportError};
use crate::pipeline::reconcile::replace;
use crate::pipeline::schedule::is_stale;
use crate::traits::site::ListingSite;
use crate::traits::source::{Harvest, SourceAdapter};
use crate::traits::store::SnapshotStore;
use crate::traits::transport::Transport;
use crate::types::config::{LinkDetailConfig, SourceConfig};
use crate::types::record::Listing;
use crate::types::snapshot::LinkCache;

/// Links found by one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub links: Vec<String>,
    pub pages: usize,
    pub failed_pages: usize,
}

/// Source built from a [`ListingSite`]: link discovery, then detail pages.
pub struct LinkDetailSource<W: ListingSite> {
    transport: Arc<dyn Transport>,
    store: Arc<dyn SnapshotStore>,
    site: W,
    source: SourceConfig,
    config: LinkDetailConfig,
}

impl<W: ListingSite> LinkDetailSource<W> {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn SnapshotStore>,
        site: W,
        source: SourceConfig,
        config: LinkDetailConfig,
    ) -> Self {
        Self {
            transport,
            store,
            site,
            source,
            config,
        }
    }

    /// Cached links when fresh, otherwise a new discovery pass.
    ///
    /// `Err` means discovery could not start: the search request failed,
    /// its count was unreadable, or a required session was not set.
    async fn links(&self) -> SyncResult<(Vec<String>, bool)> {
        if let Some(cache) = self.load_link_cache().await {
            if !is_stale(cache.retrieved_at, self.config.link_ttl, Utc::now()) {
                debug!(source = %self.source.name, links = cache.links.len(), "Using cached links");
                return Ok((cache.links, false));
            }
        }

        let discovery = self.discover().await?;
        info!(
            source = %self.source.name,
            links = discovery.links.len(),
            pages = discovery.pages,
            failed_pages = discovery.failed_pages,
            "Link discovery complete"
        );

        if !discovery.links.is_empty() {
            let cache = LinkCache::new(discovery.links.clone(), Utc::now());
            if let Err(e) = self
                .store
                .save(&self.config.link_cache_key, &cache.to_document())
                .await
            {
                warn!(source = %self.source.name, error = %e, "Failed to write link cache");
            }
        }

        Ok((discovery.links, discovery.failed_pages > 0))
    }

    async fn load_link_cache(&self) -> Option<LinkCache> {
        let key = &self.config.link_cache_key;
        match self.store.load(key).await {
            Ok(Some(document)) => match LinkCache::from_document(key, document) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    warn!(source = %self.source.name, error = %e, "Link cache unreadable, treating as absent");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(source = %self.source.name, error = %e, "Failed to read link cache, treating as absent");
                None
            }
        }
    }

    /// Walk every listing page and collect unique detail links in page order.
    pub async fn discover(&self) -> SyncResult<Discovery> {
        let search_url = self.site.search_url();
        let search = self.transport.get(&search_url, None).await?;
        let session = search.session.clone();

        if self.site.requires_session() && session.is_none() {
            return Err(TransportError::MissingSession { url: search_url }.into());
        }

        let pages = self.site.total_pages(&search)?;
        debug!(source = %self.source.name, pages, "Listing pages to visit");

        let mut links: IndexSet<String> = IndexSet::new();
        let mut failed_pages = 0;
        let mut requests = 0;

        for page in 1..=pages {
            if page == 1 && self.site.search_is_first_page() {
                links.extend(self.site.extract_links(&search));
                continue;
            }

            if requests > 0 && !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }
            requests += 1;

            let url = self.site.listing_page_url(page);
            match self.transport.get(&url, session.as_ref()).await {
                Ok(fetched) => {
                    let found = self.site.extract_links(&fetched);
                    debug!(source = %self.source.name, page, links = found.len(), "Listing page scanned");
                    links.extend(found);
                }
                Err(e) => {
                    warn!(source = %self.source.name, page, url = %url, error = %e, "Skipping listing page");
                    failed_pages += 1;
                }
            }
        }

        Ok(Discovery {
            links: links.into_iter().collect(),
            pages,
            failed_pages,
        })
    }

    /// Fetch and extract every link; failures become sentinels in place.
    pub async fn fetch_listings(&self, links: &[String]) -> (Vec<Listing>, usize) {
        let remaining = AtomicUsize::new(links.len());
        let failed = AtomicUsize::new(0);

        let listings = stream::iter(links.iter().cloned())
            .map(|link: String| {
                let remaining = &remaining;
                let failed = &failed;
                async move {
                    let listing = match self.fetch_listing(&link).await {
                        Ok(listing) => listing,
                        Err(e) => {
                            warn!(source = %self.source.name, link = %link, error = %e, "Detail fetch failed");
                            failed.fetch_add(1, Ordering::Relaxed);
                            Listing::sentinel(link.clone())
                        }
                    };
                    let left = remaining.fetch_sub(1, Ordering::Relaxed) - 1;
                    debug!(source = %self.source.name, remaining = left, "Items remaining to fetch");
                    listing
                }
            })
            .buffered(self.config.detail_concurrency)
            .collect::<Vec<_>>()
            .await;

        (listings, failed.load(Ordering::Relaxed))
    }

    async fn fetch_listing(&self, link: &str) -> SyncResult<Listing> {
        let page = self.transport.get(link, None).await?;
        let mut listing = self.site.extract_listing(link, &page)?;
        listing.link.get_or_insert_with(|| link.to_string());
        Ok(listing)
    }
}

#[async_trait]
impl<W: ListingSite + 'static> SourceAdapter for LinkDetailSource<W> {
    type Entry = Listing;
    type Item = Listing;

    fn config(&self) -> &SourceConfig {
        &self.source
    }

    async fn harvest(&self) -> SyncResult<Harvest<Listing>> {
        let (links, pages_failed) = match self.links().await {
            Ok(found) => found,
            Err(e) => {
                warn!(source = %self.source.name, error = %e, "Link discovery failed, returning empty result");
                return Ok(Harvest::failed());
            }
        };

        if links.is_empty() && pages_failed {
            return Ok(Harvest::failed());
        }

        let (listings, failed) = self.fetch_listings(&links).await;
        info!(
            source = %self.source.name,
            listings = listings.len(),
            failed,
            "Detail fetch complete"
        );

        if failed > 0 || pages_failed {
            Ok(Harvest::partial(listings))
        } else {
            Ok(Harvest::complete(listings))
        }
    }

    fn merge(&self, previous: Vec<Listing>, fresh: Vec<Listing>) -> Vec<Listing> {
        replace(previous, fresh)
    }
}
