//! Testing utilities.
//!
//! Provides a mock transport for testing without network access.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::error::{SyncResult, TransportError};
use crate::traits::transport::{FetchedPage, SessionToken, Transport};

/// A request seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub method: &'static str,
    pub url: String,
    pub body: Option<Value>,
    pub session: Option<SessionToken>,
}

/// Mock transport for testing.
///
/// Responses are keyed by exact URL. Unregistered URLs answer HTTP 404, URLs
/// registered with [`MockTransport::with_failure`] answer HTTP 503. Clones
/// share state, so a test can keep a handle to inspect the recorded calls.
///
/// # Example
///
/// ```rust
/// use listing_sync::testing::MockTransport;
/// use serde_json::json;
///
/// let mock = MockTransport::new()
///     .with_json("https://api.example.com/search?startIndex=0", json!({ "hits": [] }))
///     .with_page("https://example.com/car/1", "<h1>i5</h1>");
/// ```
#[derive(Default, Clone)]
pub struct MockTransport {
    json: Arc<RwLock<HashMap<String, Value>>>,
    pages: Arc<RwLock<HashMap<String, FetchedPage>>>,
    failures: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<MockCall>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer POSTs to `url` with `value`.
    pub fn with_json(self, url: impl Into<String>, value: Value) -> Self {
        self.json.write().unwrap().insert(url.into(), value);
        self
    }

    /// Answer GETs to `url` with `body`.
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        let url = url.into();
        let page = FetchedPage::new(url.clone(), body);
        self.pages.write().unwrap().insert(url, page);
        self
    }

    /// Answer GETs to `url` with `body` and a session cookie.
    pub fn with_session_page(
        self,
        url: impl Into<String>,
        body: impl Into<String>,
        session: &str,
    ) -> Self {
        let url = url.into();
        let page = FetchedPage::new(url.clone(), body).with_session(SessionToken::new(session));
        self.pages.write().unwrap().insert(url, page);
        self
    }

    /// Fail every request to `url`.
    pub fn with_failure(self, url: impl Into<String>) -> Self {
        self.failures.write().unwrap().insert(url.into());
        self
    }

    /// All recorded calls in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Recorded calls to one URL.
    pub fn calls_to(&self, url: &str) -> Vec<MockCall> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.url == url)
            .cloned()
            .collect()
    }

    /// Clear all recorded calls.
    pub fn reset_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn record(&self, call: MockCall) -> SyncResult<()> {
        let failing = self.failures.read().unwrap().contains(&call.url);
        let url = call.url.clone();
        self.calls.write().unwrap().push(call);
        if failing {
            return Err(TransportError::Status { url, status: 503 }.into());
        }
        Ok(())
    }
}

fn not_found(url: &str) -> crate::error::SyncError {
    TransportError::Status {
        url: url.to_string(),
        status: 404,
    }
    .into()
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(&self, url: &str, body: &Value) -> SyncResult<Value> {
        self.record(MockCall {
            method: "POST",
            url: url.to_string(),
            body: Some(body.clone()),
            session: None,
        })?;

        self.json
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| not_found(url))
    }

    async fn get(&self, url: &str, session: Option<&SessionToken>) -> SyncResult<FetchedPage> {
        self.record(MockCall {
            method: "GET",
            url: url.to_string(),
            body: None,
            session: session.cloned(),
        })?;

        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| not_found(url))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
