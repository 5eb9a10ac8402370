//! reqwest-based transport with per-request timeout and bounded retries.

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ParseError, SyncResult, TransportError};
use crate::traits::transport::{FetchedPage, SessionToken, Transport};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Retry behaviour for transient failures (connect errors, timeouts, 429, 5xx).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each following one
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Create a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| TransportError::Client { source: Box::new(e) })?;

        Ok(Self {
            client,
            retry: RetryPolicy::default(),
        })
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send a request, retrying transient failures, and return a success response.
    async fn send(&self, url: &str, build: impl Fn() -> RequestBuilder) -> SyncResult<Response> {
        let mut attempt = 0;
        loop {
            let error = match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let error = TransportError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    };
                    if !is_transient(status) {
                        return Err(error.into());
                    }
                    error
                }
                Err(e) if e.is_timeout() => TransportError::Timeout {
                    url: url.to_string(),
                },
                Err(e) if e.is_connect() || e.is_request() => TransportError::Request {
                    url: url.to_string(),
                    source: Box::new(e),
                },
                Err(e) => {
                    return Err(TransportError::Request {
                        url: url.to_string(),
                        source: Box::new(e),
                    }
                    .into())
                }
            };

            if attempt >= self.retry.max_retries {
                return Err(error.into());
            }

            let delay = self.retry.delay(attempt);
            warn!(url = %url, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %error, "Retrying request");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn read_body(url: &str, response: Response) -> SyncResult<String> {
        response.text().await.map_err(|e| {
            TransportError::Request {
                url: url.to_string(),
                source: Box::new(e),
            }
            .into()
        })
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> SyncResult<Value> {
        debug!(url = %url, "POST");
        let response = self.send(url, || self.client.post(url).json(body)).await?;
        let text = Self::read_body(url, response).await?;
        let value = serde_json::from_str(&text).map_err(ParseError::Json)?;
        Ok(value)
    }

    async fn get(&self, url: &str, session: Option<&SessionToken>) -> SyncResult<FetchedPage> {
        debug!(url = %url, with_session = session.is_some(), "GET");
        let response = self
            .send(url, || {
                let request = self.client.get(url);
                match session {
                    Some(token) => request.header(COOKIE, token.as_str()),
                    None => request,
                }
            })
            .await?;

        let final_url = response.url().to_string();
        let session = SessionToken::from_set_cookie(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        let body = Self::read_body(url, response).await?;

        let mut page = FetchedPage::new(final_url, body);
        page.session = session;
        Ok(page)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> HttpTransport {
        HttpTransport::new(Duration::from_secs(5))
            .unwrap()
            .with_retry(RetryPolicy {
                max_retries: 2,
                backoff: Duration::from_millis(1),
            })
    }

    #[tokio::test]
    async fn test_post_json_sends_filter_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(query_param("startIndex", "0"))
            .and(body_json(json!({"model": "i4"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"metadata": {"totalCount": 0}, "hits": []})),
            )
            .mount(&server)
            .await;

        let url = format!("{}/search?startIndex=0", server.uri());
        let value = transport().post_json(&url, &json!({"model": "i4"})).await.unwrap();

        assert_eq!(value["metadata"]["totalCount"], json!(0));
    }

    #[tokio::test]
    async fn test_get_captures_and_replays_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "SID=xyz; path=/")
                    .set_body_string("42"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("cookie", "SID=xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let transport = transport();
        let search = transport
            .get(&format!("{}/search", server.uri()), None)
            .await
            .unwrap();
        assert_eq!(search.body, "42");
        let session = search.session.expect("session cookie");

        let page = transport
            .get(&format!("{}/page", server.uri()), Some(&session))
            .await
            .unwrap();
        assert_eq!(page.body, "<html></html>");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let result = transport().get(&format!("{}/gone", server.uri()), None).await;

        assert!(matches!(
            result,
            Err(crate::error::SyncError::Transport(TransportError::Status { status: 404, .. }))
        ));
    }

    #[tokio::test]
    async fn test_server_error_retried_until_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let result = transport().get(&format!("{}/flaky", server.uri()), None).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = transport()
            .post_json(&format!("{}/search", server.uri()), &json!({}))
            .await;

        assert!(matches!(result, Err(crate::error::SyncError::Parse(_))));
    }
}
