use axum::{
    extract::{Extension, Path},
    http::HeaderValue,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::server::app::AppState;
use crate::server::error::ApiError;

/// Header reporting whether the body came from cache or a fresh crawl.
pub const SNAPSHOT_ORIGIN_HEADER: &str = "x-snapshot-origin";

/// Serve the snapshot for `/api/{model}/{listing}`.
///
/// The crawl runs on its own task so a client disconnect does not abort it;
/// the snapshot still gets written for the next caller.
pub async fn listing_handler(
    Extension(state): Extension<AppState>,
    Path((model, listing)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let key = format!("{}/{}", model, listing);
    let source = state
        .sources
        .get(&key)
        .cloned()
        .ok_or_else(|| ApiError::UnknownSource(key.clone()))?;

    let served = tokio::spawn(async move { source.serve().await }).await??;

    tracing::debug!(
        source = %key,
        origin = %served.origin,
        records = served.records,
        "Serving snapshot"
    );

    let mut response = Json(served.body).into_response();
    response.headers_mut().insert(
        SNAPSHOT_ORIGIN_HEADER,
        HeaderValue::from_static(served.origin.as_str()),
    );
    Ok(response)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    key: String,
    ttl_seconds: i64,
}

/// List the served sources and their refresh intervals.
pub async fn sources_handler(Extension(state): Extension<AppState>) -> Json<Vec<SourceInfo>> {
    let sources = state
        .sources
        .iter()
        .map(|(key, source)| SourceInfo {
            key: key.clone(),
            ttl_seconds: source.config().ttl.num_seconds(),
        })
        .collect();
    Json(sources)
}
