//! HTTP transport seam.
//!
//! Sources never talk to reqwest directly; they go through [`Transport`] so
//! tests can substitute [`crate::testing::MockTransport`].

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::SyncResult;

/// Opaque session capability (a cookie string) captured from a search
/// response and replayed on later requests to the same site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Build a `Cookie` header value from raw `set-cookie` header values,
    /// keeping only the `name=value` part of each.
    pub fn from_set_cookie<'a>(headers: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let pairs: Vec<&str> = headers
            .into_iter()
            .filter_map(|h| h.split(';').next())
            .map(str::trim)
            .filter(|pair| pair.contains('='))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(Self(pairs.join("; ")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An HTML (or plain text) page returned by a GET.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,

    /// Response body
    pub body: String,

    /// Session captured from `set-cookie`, if any
    pub session: Option<SessionToken>,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            session: None,
        }
    }

    pub fn with_session(mut self, session: SessionToken) -> Self {
        self.session = Some(session);
        self
    }
}

/// Network access used by the source adapters.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body and decode the JSON response.
    async fn post_json(&self, url: &str, body: &Value) -> SyncResult<Value>;

    /// GET a page, replaying `session` as a cookie when given.
    async fn get(&self, url: &str, session: Option<&SessionToken>) -> SyncResult<FetchedPage>;

    /// Get the transport name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post_json(&self, url: &str, body: &Value) -> SyncResult<Value> {
        (**self).post_json(url, body).await
    }

    async fn get(&self, url: &str, session: Option<&SessionToken>) -> SyncResult<FetchedPage> {
        (**self).get(url, session).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
