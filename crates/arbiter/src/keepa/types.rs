//! Keepa API data types.
//!
//! Only the fields the engine reads are declared. Products are handed to the
//! coordinator as raw JSON and decoded again in [`super::convert`].
//!
//! API docs: https://keepa.com/#!discuss/t/product-object/116

use serde::Deserialize;

/// Body of a `/product` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepaResponse {
    #[serde(default)]
    pub products: Vec<serde_json::Value>,
    /// Tokens remaining after this request.
    pub tokens_left: Option<f64>,
    /// Milliseconds until the bucket next refills.
    pub refill_in: Option<u64>,
    /// Set when the request was accepted but could not be served.
    pub error: Option<KeepaApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeepaApiError {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
}

impl std::fmt::Display for KeepaApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.message) {
            (Some(kind), Some(message)) => write!(f, "{kind}: {message}"),
            (Some(kind), None) => f.write_str(kind),
            (None, Some(message)) => f.write_str(message),
            (None, None) => f.write_str("unknown error"),
        }
    }
}

/// One product object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepaProduct {
    pub asin: String,
    pub title: Option<String>,
    /// Keepa minutes of the last data refresh.
    pub last_update: Option<i64>,
    pub stats: Option<KeepaStats>,
    /// Price histories indexed by CSV type. Each history is a flat
    /// `[time, value, time, value, ...]` array; missing types are `null`.
    #[serde(default)]
    pub csv: Vec<Option<Vec<i64>>>,
}

/// The `stats` block requested with `stats=90`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepaStats {
    /// Current value per CSV type; `-1` when unavailable.
    #[serde(default)]
    pub current: Vec<Option<i64>>,
    /// 90-day average per CSV type.
    #[serde(default)]
    pub avg90: Vec<Option<i64>>,
}
