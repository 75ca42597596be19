//! Fire-and-forget notifications.
//!
//! The reconciler and the CLI report noteworthy events ("item sold on eBay,
//! remove it from BrickLink") through a [`NotificationSink`]. Delivery is
//! best effort: [`notify_best_effort`] logs a failed send and returns, so a
//! broken webhook never changes the outcome of the operation that raised
//! the event.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::entity::source::Source;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpTransport};

/// Something an operator may want to hear about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A cross-listed item sold and removals were queued.
    RemovalNeeded {
        item_key: String,
        sale_source: Source,
        order_id: String,
        sale_price: Option<Decimal>,
        sold_at: DateTime<Utc>,
        targets: Vec<Source>,
    },
    /// Reconciliation could not process an order.
    ReconciliationFailed {
        sale_source: Source,
        order_id: String,
        error: String,
    },
    /// A sync pass for one source failed outright.
    SyncFailed { source: Source, error: String },
}

impl NotificationEvent {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        match self {
            Self::RemovalNeeded {
                item_key,
                sale_source,
                targets,
                ..
            } => {
                let targets: Vec<&str> = targets.iter().map(|t| t.as_str()).collect();
                format!(
                    "{item_key} sold on {sale_source}; remove from {}",
                    targets.join(", ")
                )
            }
            Self::ReconciliationFailed {
                sale_source,
                order_id,
                error,
            } => format!("could not reconcile {sale_source} order {order_id}: {error}"),
            Self::SyncFailed { source, error } => format!("{source} sync failed: {error}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("could not encode notification: {0}")]
    Encode(String),

    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification endpoint answered {status}")]
    Rejected { status: u16 },
}

/// Destination for notification events.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}

/// Send `event`, logging instead of propagating a failure.
pub async fn notify_best_effort(sink: &dyn NotificationSink, event: NotificationEvent) {
    if let Err(e) = sink.send(&event).await {
        tracing::warn!(error = %e, event = %event.summary(), "Notification not delivered");
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn send(&self, _event: &NotificationEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        tracing::info!(target: "arbiter::notify", "{}", event.summary());
        Ok(())
    }
}

/// POSTs each event as JSON to a webhook.
#[derive(Clone)]
pub struct WebhookSink {
    transport: Arc<dyn HttpTransport>,
    url: String,
}

impl WebhookSink {
    pub fn new(url: &str) -> Result<Self, NotifyError> {
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(10))
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self::new_with_transport(url, Arc::new(transport)))
    }

    pub fn new_with_transport(url: &str, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        let request = HttpRequest::post_json(&self.url, event)
            .map_err(|e| NotifyError::Encode(e.to_string()))?;
        let resp = self
            .transport
            .send(request)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        if !resp.is_success() {
            return Err(NotifyError::Rejected {
                status: resp.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport, json_response};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const HOOK: &str = "https://hooks.test/arbiter";

    fn removal() -> NotificationEvent {
        NotificationEvent::RemovalNeeded {
            item_key: "75192".to_string(),
            sale_source: Source::Ebay,
            order_id: "12-34567-89012".to_string(),
            sale_price: Some(dec!(649.99)),
            sold_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            targets: vec![Source::Amazon, Source::BrickLink],
        }
    }

    #[test]
    fn summary_names_item_and_targets() {
        assert_eq!(
            removal().summary(),
            "75192 sold on ebay; remove from amazon, bricklink"
        );
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let value = serde_json::to_value(NotificationEvent::SyncFailed {
            source: Source::Keepa,
            error: "Authentication required".to_string(),
        })
        .unwrap();
        assert_eq!(value["type"], "sync_failed");
        assert_eq!(value["source"], "keepa");
    }

    #[tokio::test]
    async fn webhook_posts_json() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Post, HOOK, json!({"ok": true}));

        let sink = WebhookSink::new_with_transport(HOOK, Arc::new(transport.clone()));
        sink.send(&removal()).await.unwrap();

        let sent = transport.requests();
        let body: serde_json::Value = serde_json::from_slice(&sent[0].body).unwrap();
        assert_eq!(body["type"], "removal_needed");
        assert_eq!(body["item_key"], "75192");
    }

    #[tokio::test]
    async fn webhook_rejection_is_an_error() {
        let transport = MockTransport::new();
        transport.push_response(HttpMethod::Post, HOOK, json_response(500, json!({})));

        let sink = WebhookSink::new_with_transport(HOOK, Arc::new(transport));
        let err = sink.send(&removal()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 500 }));
    }

    #[tokio::test]
    async fn best_effort_swallows_failures() {
        // No route registered: the transport errors.
        let sink = WebhookSink::new_with_transport(HOOK, Arc::new(MockTransport::new()));
        notify_best_effort(&sink, removal()).await;
    }
}
