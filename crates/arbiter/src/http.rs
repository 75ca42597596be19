//! HTTP transport boundary used by every source adapter and the webhook sink.
//!
//! Adapters build [`HttpRequest`]s and hand them to an [`HttpTransport`];
//! they never touch `reqwest` directly. [`check_status`] turns non-success
//! responses into [`PlatformError`]s so every source classifies auth
//! failures, misses and throttling the same way.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::platform::PlatformError;

/// Minimal HTTP method enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// HTTP headers represented as key/value pairs.
///
/// Header names are treated case-insensitively by helper functions.
pub type HttpHeaders = Vec<(String, String)>;

/// A minimal HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// POST with a JSON body.
    pub fn post_json<T: Serialize>(url: impl Into<String>, body: &T) -> Result<Self, HttpError> {
        let body = serde_json::to_vec(body).map_err(|e| HttpError::Encode(e.to_string()))?;
        Ok(Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
        })
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }
}

/// A minimal HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PlatformError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| PlatformError::api(self.status, format!("invalid JSON body: {e}")))
    }

    /// A short, lossy excerpt of the body for error messages.
    pub fn body_excerpt(&self) -> String {
        let text = String::from_utf8_lossy(&self.body);
        text.chars().take(200).collect()
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("could not encode request body: {0}")]
    Encode(String),

    #[error("no mock response registered for {method} {url}")]
    NoMockResponse { method: String, url: String },
}

impl From<HttpError> for PlatformError {
    fn from(err: HttpError) -> Self {
        PlatformError::network(err.to_string())
    }
}

/// Transport boundary for all HTTP I/O.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Get the first header value matching `name` (case-insensitive).
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Join `path` onto `base` and append `query` pairs in order.
///
/// Values are form-encoded, so callers pass them raw.
pub fn build_url(
    base: &str,
    path: &str,
    query: &[(&str, String)],
) -> Result<String, PlatformError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = url::Url::parse(&joined)
        .map_err(|e| PlatformError::internal(format!("invalid URL {joined}: {e}")))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in query {
            pairs.append_pair(k, v);
        }
    }
    Ok(url.to_string())
}

/// Retry-after advertised by a throttling response.
///
/// Checks the `Retry-After` header (seconds) first, then a JSON body field
/// `refillIn` (milliseconds) as sent by token-metered APIs.
pub fn retry_after(resp: &HttpResponse) -> Option<Duration> {
    if let Some(secs) = resp
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return Some(Duration::from_secs(secs));
    }

    serde_json::from_slice::<serde_json::Value>(&resp.body)
        .ok()
        .and_then(|body| body.get("refillIn").and_then(|v| v.as_u64()))
        .map(Duration::from_millis)
}

/// Pass successful responses through; map the rest to `PlatformError`.
///
/// `resource` names what was requested, for not-found messages.
pub fn check_status(resp: HttpResponse, resource: &str) -> Result<HttpResponse, PlatformError> {
    match resp.status {
        s if (200..300).contains(&s) => Ok(resp),
        401 | 403 => Err(PlatformError::AuthRequired),
        404 => Err(PlatformError::not_found(resource)),
        429 => Err(PlatformError::RateLimited {
            retry_after: retry_after(&resp),
        }),
        s => Err(PlatformError::api(s, resp.body_excerpt())),
    }
}

pub mod reqwest_transport {
    use super::*;

    use std::time::Duration as StdDuration;

    /// A real HTTP transport backed by reqwest.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }

        pub fn with_timeout(timeout: StdDuration) -> Result<Self, HttpError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("arbiter/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| HttpError::Transport(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let HttpRequest {
                method,
                url,
                headers,
                body,
            } = request;
            let method = match method {
                HttpMethod::Get => reqwest::Method::GET,
                HttpMethod::Post => reqwest::Method::POST,
            };

            let builder = headers
                .iter()
                .fold(self.client.request(method, &url), |b, (k, v)| {
                    b.header(k.as_str(), v.as_str())
                });
            let builder = if body.is_empty() {
                builder
            } else {
                builder.body(body)
            };

            let transport_err = |e: reqwest::Error| HttpError::Transport(e.to_string());
            let resp = builder.send().await.map_err(transport_err)?;

            let status = resp.status().as_u16();
            let headers: HttpHeaders = resp
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = resp.bytes().await.map_err(transport_err)?.to_vec();

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(test)]
pub use mock::{MockTransport, json_response};


#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, headers: HttpHeaders, body: &[u8]) -> HttpResponse {
        HttpResponse {
            status,
            headers,
            body: body.to_vec(),
        }
    }

    #[test]
    fn header_get_is_case_insensitive_and_returns_first_match() {
        let headers: HttpHeaders = vec![
            ("Retry-After".to_string(), "30".to_string()),
            ("retry-after".to_string(), "60".to_string()),
        ];
        assert_eq!(header_get(&headers, "retry-after"), Some("30"));
        assert_eq!(header_get(&headers, "RETRY-AFTER"), Some("30"));
        assert_eq!(header_get(&headers, "missing"), None);
    }

    #[test]
    fn check_status_maps_auth_and_not_found() {
        let err = check_status(response(401, Vec::new(), b""), "orders").unwrap_err();
        assert!(matches!(err, PlatformError::AuthRequired));

        let err = check_status(response(403, Vec::new(), b""), "orders").unwrap_err();
        assert!(matches!(err, PlatformError::AuthRequired));

        let err = check_status(response(404, Vec::new(), b""), "order 42").unwrap_err();
        assert!(err.to_string().contains("order 42"));
    }

    #[test]
    fn check_status_reads_retry_after_header() {
        let resp = response(
            429,
            vec![("Retry-After".to_string(), "17".to_string())],
            b"",
        );
        match check_status(resp, "x").unwrap_err() {
            PlatformError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(17)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn check_status_reads_refill_in_body() {
        let resp = response(429, Vec::new(), br#"{"refillIn": 12500, "tokensLeft": -3}"#);
        match check_status(resp, "x").unwrap_err() {
            PlatformError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_millis(12500)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn check_status_keeps_body_excerpt_for_server_errors() {
        let err = check_status(response(502, Vec::new(), b"bad gateway"), "x").unwrap_err();
        assert!(matches!(err, PlatformError::Api { status: 502, .. }));
        assert!(err.to_string().contains("bad gateway"));
    }

    #[test]
    fn build_url_joins_and_encodes() {
        let url = build_url(
            "https://api.keepa.com/",
            "/product",
            &[("domain", "2".to_string()), ("asin", "B01,B02".to_string())],
        )
        .expect("valid url");
        assert_eq!(url, "https://api.keepa.com/product?domain=2&asin=B01%2CB02");

        assert!(build_url("not a url", "x", &[]).is_err());
    }

    #[test]
    fn post_json_sets_content_type() {
        let req = HttpRequest::post_json("https://hooks.example.com", &serde_json::json!({"a": 1}))
            .expect("encodes");
        assert_eq!(header_get(&req.headers, "content-type"), Some("application/json"));
        assert_eq!(req.body, br#"{"a":1}"#.to_vec());
    }

    #[tokio::test]
    async fn mock_transport_returns_registered_response_and_records_request() {
        let transport = MockTransport::new();
        let url = "https://example.com/api";
        transport.push_json(HttpMethod::Get, url, serde_json::json!({"ok": true}));

        let req = HttpRequest::get(url).bearer("secret");
        let resp = transport.send(req.clone()).await.expect("mock response");
        assert_eq!(resp.status, 200);
        let body: serde_json::Value = resp.json().expect("json");
        assert_eq!(body["ok"], true);

        assert_eq!(transport.requests(), vec![req]);
    }

    #[tokio::test]
    async fn mock_transport_errors_when_no_response_is_registered() {
        let transport = MockTransport::new();
        let err = transport
            .send(HttpRequest::get("https://example.com/missing"))
            .await
            .expect_err("missing mock should error");
        match err {
            HttpError::NoMockResponse { method, url } => {
                assert_eq!(method, "GET");
                assert_eq!(url, "https://example.com/missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reqwest_transport_with_timeout_builds_client() {
        let transport = reqwest_transport::ReqwestTransport::with_timeout(Duration::from_millis(1))
            .expect("reqwest transport should build");
        let _ = transport;
    }
}
