//! Arbiter - multi-marketplace order sync, reconciliation and arbitrage.
//!
//! This library pulls orders, prices and competing listings from Amazon,
//! eBay, BrickLink and Keepa into one database, detects cross-listed items
//! that sold on one marketplace and must come down elsewhere, and computes
//! exclusion-aware margins against the cheapest comparison listing.
//!
//! # Features
//!
//! - `amazon`, `ebay`, `bricklink`, `keepa` - One source adapter each.
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//! - `sqlite` / `postgres` - Database drivers.
//!
//! # Example
//!
//! ```ignore
//! use arbiter::{connect_and_migrate, EngineContext, SyncCoordinator, SyncMode, SyncOptions};
//!
//! let db = connect_and_migrate("sqlite://arbiter.db?mode=rwc").await?;
//! let ctx = EngineContext::builder()
//!     .database(Arc::new(db))
//!     .user_id(user_id)
//!     .build()?;
//!
//! let coordinator = SyncCoordinator::new(ctx, SyncOptions::default());
//! let result = coordinator.run_orders(&adapter, SyncMode::Incremental).await;
//! ```

pub mod arbitrage;
pub mod db;
pub mod entity;
pub mod http;
pub mod money;
pub mod notify;
pub mod platform;
pub mod reconcile;
pub mod retry;
pub mod status;
pub mod store;
pub mod sync;

#[cfg(feature = "amazon")]
pub mod amazon;

#[cfg(feature = "ebay")]
pub mod ebay;

#[cfg(feature = "bricklink")]
pub mod bricklink;

#[cfg(feature = "keepa")]
pub mod keepa;

#[cfg(feature = "migrate")]
pub mod migration;

pub use arbitrage::{ArbitrageCalculator, ArbitrageFilter, ArbitrageSort, ItemMargins};
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use notify::{LogSink, NoopSink, NotificationEvent, NotificationSink, WebhookSink};
pub use platform::{
    BudgetConfig, PlatformError, RateLimitedClient, SourceAdapter, rate_limits,
    short_error_message,
};
pub use reconcile::{CrossPlatformReconciler, ReconcileOptions, RemovalReview};
pub use status::{JobIntervals, SyncStatusTracker};
pub use store::StoreError;
pub use sync::{EngineContext, PassKind, SyncCoordinator, SyncMode, SyncOptions};
