//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::Extension, http::Method, routing::get, Router};
use listing_sync::{FileStore, HttpTransport, RetryPolicy, SnapshotStore, Transport};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::server::routes::{health_handler, listing_handler, sources_handler};
use crate::sites::{build_sources, SourceRegistry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sources: Arc<SourceRegistry>,
}

impl AppState {
    pub fn new(sources: SourceRegistry) -> Self {
        Self {
            sources: Arc::new(sources),
        }
    }

    /// Wire the production transport and file store from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config.http_timeout())
            .context("Failed to build HTTP client")?
            .with_retry(RetryPolicy {
                max_retries: config.http_max_retries,
                ..RetryPolicy::default()
            });
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let store: Arc<dyn SnapshotStore> = Arc::new(FileStore::new(&config.data_dir));

        Ok(Self::new(build_sources(config, transport, store)))
    }
}

/// Build the router over `state`.
pub fn build_app(state: AppState) -> Router {
    // CORS configuration - the dashboard is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/api/sources", get(sources_handler))
        .route("/api/:model/:listing", get(listing_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
