//! Concrete listing sources and the registry the router serves from.

pub mod bmw_premium;
pub mod bmw_stock;
pub mod html;
pub mod porsche_finder;

use chrono::Duration;
use indexmap::IndexMap;
use listing_sync::{
    LinkDetailConfig, LinkDetailSource, ListingSite, Orchestrator, PagedApiSource,
    SnapshotLayout, SnapshotSource, SnapshotStore, SourceConfig, Transport,
};
use std::sync::Arc;

use crate::config::Config;
pub use bmw_premium::BmwPremiumSelection;
pub use bmw_stock::StockModel;
pub use porsche_finder::PorscheFinder;

/// Sources by route key (`"{model}/{listing}"`), in registration order.
pub type SourceRegistry = IndexMap<String, Arc<dyn SnapshotSource>>;

/// Build every source served by the application.
pub fn build_sources(
    config: &Config,
    transport: Arc<dyn Transport>,
    store: Arc<dyn SnapshotStore>,
) -> SourceRegistry {
    let mut sources = SourceRegistry::new();

    for model in [StockModel::I4, StockModel::I5] {
        let source = PagedApiSource::new(
            transport.clone(),
            SourceConfig::new(model.route_key(), SnapshotLayout::Statused)
                .with_ttl(config.api_ttl()),
            model.api_config().with_page_delay(config.request_delay()),
        );
        register(&mut sources, Orchestrator::new(source, store.clone()));
    }

    let bmw_used = link_source(
        config,
        &transport,
        &store,
        BmwPremiumSelection::default(),
        "i5/used",
        config.listing_ttl(),
    );
    register(&mut sources, bmw_used);

    // never cached upstream: always refresh, but keep the last result on disk
    let taycan_used = link_source(
        config,
        &transport,
        &store,
        PorscheFinder::default(),
        "taycan/used",
        Duration::zero(),
    );
    register(&mut sources, taycan_used);

    sources
}

fn link_source<W: ListingSite + 'static>(
    config: &Config,
    transport: &Arc<dyn Transport>,
    store: &Arc<dyn SnapshotStore>,
    site: W,
    key: &str,
    ttl: Duration,
) -> Orchestrator<LinkDetailSource<W>> {
    let source = LinkDetailSource::new(
        transport.clone(),
        store.clone(),
        site,
        SourceConfig::new(key, SnapshotLayout::Listing).with_ttl(ttl),
        LinkDetailConfig::new(format!("{}-links", key))
            .with_link_ttl(ttl)
            .with_detail_concurrency(config.detail_concurrency)
            .with_page_delay(config.request_delay()),
    );
    Orchestrator::new(source, store.clone())
}

fn register<S: SnapshotSource + 'static>(sources: &mut SourceRegistry, source: S) {
    let key = source.config().name.clone();
    sources.insert(key, Arc::new(source));
}
