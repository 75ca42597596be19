//! Sync orchestration shared by every source.
//!
//! # Module Structure
//!
//! - [`types`] - Modes, options and results: `SyncMode`, `SyncOptions`, `SourceSyncResult`, `SyncSummary`
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`context`] - `EngineContext`, the explicit handle bundle every component receives
//! - [`coordinator`] - `SyncCoordinator`: order, price and comparison passes
//!
//! # Example
//!
//! ```ignore
//! use arbiter::sync::{EngineContext, SyncCoordinator, SyncMode, SyncOptions};
//!
//! let ctx = EngineContext::builder().database(db).user_id(user).build()?;
//! let coordinator = SyncCoordinator::new(ctx, SyncOptions::default());
//! let result = coordinator.run_orders(&amazon, SyncMode::Incremental).await;
//! println!("{} created, {} updated", result.created, result.updated);
//! ```

mod context;
mod coordinator;
mod progress;
mod types;

pub use context::{ContextError, EngineContext, EngineContextBuilder};
pub use coordinator::{PassKind, SyncCoordinator};
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use types::{
    DEFAULT_CONCURRENCY, DEFAULT_PAGE_LIMIT, DEFAULT_PASS_TIMEOUT, SourceSyncResult, SyncMode,
    SyncOptions, SyncSummary,
};
