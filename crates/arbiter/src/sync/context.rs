//! Explicit engine context.
//!
//! Everything a component needs from its surroundings (database, acting
//! user, notification sink, progress callback, shutdown flag) is bundled in
//! one [`EngineContext`], built once at startup and cloned into each
//! component.
//!
//! # Example
//!
//! ```ignore
//! use arbiter::sync::EngineContext;
//!
//! let ctx = EngineContext::builder()
//!     .database(Arc::new(db))
//!     .user_id(user_id)
//!     .notifier(Arc::new(LogSink))
//!     .progress(callback)
//!     .build()?;
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::notify::{NoopSink, NotificationSink};

use super::progress::ProgressCallback;

/// Error type for context construction.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// Missing required field in builder.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
}

/// Builder for [`EngineContext`].
#[derive(Default)]
pub struct EngineContextBuilder {
    database: Option<Arc<DatabaseConnection>>,
    user_id: Option<Uuid>,
    notifier: Option<Arc<dyn NotificationSink>>,
    progress: Option<Arc<ProgressCallback>>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl EngineContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database(mut self, db: Arc<DatabaseConnection>) -> Self {
        self.database = Some(db);
        self
    }

    pub fn user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Defaults to a sink that drops every event.
    pub fn notifier(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(sink);
        self
    }

    pub fn progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Set the shutdown flag for graceful shutdown.
    pub fn shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// # Errors
    ///
    /// Returns `ContextError::MissingField` if the database or user is not set.
    pub fn build(self) -> Result<EngineContext, ContextError> {
        let db = self
            .database
            .ok_or(ContextError::MissingField { field: "database" })?;
        let user_id = self
            .user_id
            .ok_or(ContextError::MissingField { field: "user_id" })?;

        Ok(EngineContext {
            db,
            user_id,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(NoopSink)),
            progress: self.progress,
            shutdown_flag: self.shutdown_flag,
        })
    }
}

/// Shared handles for every engine component. Cheap to clone.
#[derive(Clone)]
pub struct EngineContext {
    db: Arc<DatabaseConnection>,
    user_id: Uuid,
    notifier: Arc<dyn NotificationSink>,
    progress: Option<Arc<ProgressCallback>>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl EngineContext {
    pub fn builder() -> EngineContextBuilder {
        EngineContextBuilder::new()
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn db_handle(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.db)
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn notifier(&self) -> &dyn NotificationSink {
        self.notifier.as_ref()
    }

    pub fn progress(&self) -> Option<&ProgressCallback> {
        self.progress.as_deref()
    }

    pub fn progress_handle(&self) -> Option<Arc<ProgressCallback>> {
        self.progress.clone()
    }

    /// Whether Ctrl+C (or the embedding program) asked passes to stop.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;

    fn mock_db() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Sqlite).into_connection())
    }

    #[test]
    fn build_requires_database_and_user() {
        let err = EngineContext::builder()
            .user_id(Uuid::nil())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ContextError::MissingField { field: "database" }));

        let err = EngineContext::builder()
            .database(mock_db())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ContextError::MissingField { field: "user_id" }));
    }

    #[test]
    fn shutdown_flag_is_observed() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = EngineContext::builder()
            .database(mock_db())
            .user_id(Uuid::nil())
            .shutdown_flag(Arc::clone(&flag))
            .build()
            .unwrap();

        assert!(!ctx.is_shutdown_requested());
        flag.store(true, Ordering::SeqCst);
        assert!(ctx.is_shutdown_requested());
    }

    #[test]
    fn context_without_flag_never_stops() {
        let ctx = EngineContext::builder()
            .database(mock_db())
            .user_id(Uuid::nil())
            .build()
            .unwrap();
        assert!(!ctx.is_shutdown_requested());
        assert!(ctx.progress().is_none());
    }
}
