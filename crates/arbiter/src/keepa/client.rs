//! Keepa API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::convert::{domain_currency, to_price_snapshot};
use super::error::KeepaError;
use super::types::KeepaResponse;
use crate::entity::source::Source;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpResponse, HttpTransport, build_url, check_status, retry_after};
use crate::platform::{
    Capabilities, Fetched, LineItemMode, PlatformError, PriceSnapshot, RawRecord, Result,
    SourceAdapter, rate_limits,
};

/// Default Keepa API host.
pub const KEEPA_API_URL: &str = "https://api.keepa.com";

/// Keepa domain id for amazon.co.uk.
pub const DOMAIN_UK: u8 = 2;

/// Days of history summarised in the `stats` block.
const STATS_DAYS: u32 = 90;

/// Keepa's advertised refill time is floored at this value.
const MIN_REFILL_WAIT: Duration = Duration::from_secs(10);
const REFILL_PADDING: Duration = Duration::from_secs(2);
/// Used when a 429 carries no `refillIn`.
const DEFAULT_REFILL_WAIT: Duration = Duration::from_secs(60);

/// Keepa product API client.
#[derive(Clone)]
pub struct KeepaAdapter {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    api_key: String,
    domain: u8,
}

impl KeepaAdapter {
    /// Create a client for the public Keepa API.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let adapter = KeepaAdapter::new("api-key", DOMAIN_UK)?;
    /// ```
    pub fn new(api_key: &str, domain: u8) -> std::result::Result<Self, KeepaError> {
        if api_key.trim().is_empty() {
            return Err(KeepaError::MissingKey);
        }
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(30))
            .map_err(|e| KeepaError::Http(e.to_string()))?;

        Ok(Self::new_with_transport(
            KEEPA_API_URL,
            api_key,
            domain,
            Arc::new(transport),
        ))
    }

    pub fn new_with_transport(
        base_url: &str,
        api_key: &str,
        domain: u8,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            domain,
        }
    }

    /// Point the client at another host (sandbox, proxy).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn domain(&self) -> u8 {
        self.domain
    }

    fn product_url(&self, asins: &[String]) -> Result<String> {
        build_url(
            &self.base_url,
            "product",
            &[
                ("key", self.api_key.clone()),
                ("domain", self.domain.to_string()),
                ("asin", asins.join(",")),
                ("stats", STATS_DAYS.to_string()),
                ("buybox", "1".to_string()),
                ("history", "1".to_string()),
            ],
        )
    }
}

/// How long to back off after a 429.
fn throttle_wait(resp: &HttpResponse) -> Duration {
    retry_after(resp)
        .unwrap_or(DEFAULT_REFILL_WAIT)
        .max(MIN_REFILL_WAIT)
        + REFILL_PADDING
}

#[async_trait]
impl SourceAdapter for KeepaAdapter {
    fn source(&self) -> Source {
        Source::Keepa
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            orders: false,
            line_items: LineItemMode::Inline,
            prices: true,
            listings: false,
        }
    }

    fn max_batch_size(&self) -> usize {
        rate_limits::KEEPA_MAX_BATCH
    }

    async fn fetch_batch(&self, ids: &[String]) -> Result<Fetched<Vec<RawRecord>>> {
        // The request URL carries the API key, so it is never logged.
        let request =
            HttpRequest::get(self.product_url(ids)?).header("Accept", "application/json");
        let resp = self.transport.send(request).await?;

        if resp.status == 429 {
            return Err(PlatformError::RateLimited {
                retry_after: Some(throttle_wait(&resp)),
            });
        }
        let resp = check_status(resp, "keepa products")?;
        let body: KeepaResponse = resp.json()?;

        if let Some(err) = body.error {
            return Err(PlatformError::api(resp.status, err.to_string()));
        }

        tracing::debug!(
            requested = ids.len(),
            returned = body.products.len(),
            tokens_left = ?body.tokens_left,
            "Fetched Keepa products"
        );

        Ok(Fetched::with_tokens(body.products, body.tokens_left))
    }

    fn normalize_price(&self, raw: &RawRecord) -> Result<PriceSnapshot> {
        to_price_snapshot(raw, domain_currency(self.domain))
    }
}
