use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Row not found.
    #[error("Not found: {context}")]
    NotFound { context: String },

    /// Invalid input data.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// A state change that the row's current state does not allow.
    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Bulk operation partially failed.
    #[error("Bulk operation failed: {succeeded} succeeded, {failed} failed")]
    PartialFailure { succeeded: usize, failed: usize },
}

impl StoreError {
    /// Create a NotFound error for a UUID lookup.
    pub fn not_found_by_id(kind: &str, id: Uuid) -> Self {
        Self::NotFound {
            context: format!("{kind} id={id}"),
        }
    }

    /// Create a NotFound error for a natural key lookup.
    pub fn not_found_by_key(kind: &str, key: impl std::fmt::Display) -> Self {
        Self::NotFound {
            context: format!("{kind} {key}"),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Whether the failure is the database itself rather than the input.
    pub fn is_systemic(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
