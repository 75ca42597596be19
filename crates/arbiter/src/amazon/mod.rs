//! Amazon Selling Partner API order source.
//!
//! Order summaries come from `GET /orders/v0/orders`; line items need a
//! second call per order, which the coordinator can skip.

mod client;
mod convert;
mod error;
mod types;

pub use client::{AMAZON_EU_URL, AmazonAdapter, UK_MARKETPLACE_ID};
pub use convert::{to_line_items, to_normalized_order};
pub use error::AmazonError;
pub use types::{AmazonMoney, AmazonOrder, AmazonOrderItem};
