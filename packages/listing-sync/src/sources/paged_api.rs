//! Paged JSON search API adapter.
//!
//! POSTs the configured filter with an increasing offset until the total
//! announced by the first response has been collected. All-or-nothing: a
//! single failed page aborts the harvest.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::error::{ParseError, SyncResult, TransportError};
use crate::pipeline::reconcile::reconcile;
use crate::traits::source::{Harvest, SourceAdapter};
use crate::traits::transport::Transport;
use crate::types::config::{PagedApiConfig, SourceConfig};
use crate::types::record::{Record, StatusedRecord};

#[derive(Debug, Deserialize)]
struct ApiPage {
    metadata: ApiMetadata,
    #[serde(default)]
    hits: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMetadata {
    total_count: usize,
}

/// Build the URL for one page: `endpoint` with `param=offset` appended.
pub fn page_url(endpoint: &str, param: &str, offset: usize) -> SyncResult<String> {
    let mut url = Url::parse(endpoint).map_err(|_| TransportError::InvalidUrl {
        url: endpoint.to_string(),
    })?;
    url.query_pairs_mut().append_pair(param, &offset.to_string());
    Ok(url.into())
}

/// Lifecycle-reconciled source backed by a paged search API.
pub struct PagedApiSource {
    transport: Arc<dyn Transport>,
    source: SourceConfig,
    api: PagedApiConfig,
}

impl PagedApiSource {
    pub fn new(transport: Arc<dyn Transport>, source: SourceConfig, api: PagedApiConfig) -> Self {
        Self {
            transport,
            source,
            api,
        }
    }

    async fn fetch_page(&self, offset: usize) -> SyncResult<ApiPage> {
        let url = page_url(&self.api.endpoint, &self.api.offset_param, offset)?;
        let value = self.transport.post_json(&url, &self.api.filter).await?;
        let page = serde_json::from_value(value).map_err(ParseError::Json)?;
        Ok(page)
    }
}

#[async_trait]
impl SourceAdapter for PagedApiSource {
    type Entry = StatusedRecord;
    type Item = Record;

    fn config(&self) -> &SourceConfig {
        &self.source
    }

    async fn harvest(&self) -> SyncResult<Harvest<Record>> {
        let mut records: Vec<Record> = Vec::new();
        let mut total: Option<usize> = None;
        let mut requests = 0usize;

        loop {
            let offset = records.len();
            if matches!(total, Some(total) if offset >= total) {
                break;
            }

            if requests > 0 && !self.api.page_delay.is_zero() {
                tokio::time::sleep(self.api.page_delay).await;
            }

            let page = self.fetch_page(offset).await?;
            requests += 1;

            // totalCount is latched from the first response
            let expected = *total.get_or_insert(page.metadata.total_count);

            if page.hits.is_empty() && offset < expected {
                return Err(ParseError::shape(format!(
                    "empty page at offset {} before reaching total {}",
                    offset, expected
                ))
                .into());
            }

            for hit in page.hits {
                let record = Record::from_value(hit)?;
                if self.api.key.of(&record).is_none() {
                    return Err(ParseError::MissingField {
                        field: self.api.key.pointer().to_string(),
                    }
                    .into());
                }
                records.push(record);
            }

            debug!(
                source = %self.source.name,
                offset,
                fetched = records.len(),
                total = expected,
                "Fetched page"
            );
        }

        info!(source = %self.source.name, records = records.len(), requests, "Harvest complete");
        Ok(Harvest::complete(records))
    }

    fn merge(&self, previous: Vec<StatusedRecord>, fresh: Vec<Record>) -> Vec<StatusedRecord> {
        let result = reconcile(previous, fresh, &self.api.key);
        info!(
            source = %self.source.name,
            available = result.available_count(),
            added = result.added.len(),
            sold = result.sold.len(),
            "Reconciled snapshot"
        );
        result.records
    }
}
