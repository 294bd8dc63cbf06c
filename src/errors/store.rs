//! Persistence adapter errors

use thiserror::Error;

/// Errors reported by a [`Model`](crate::model::Model) implementation
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database operation failed
    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A row could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A submitted value does not fit the column it targets
    #[error("Cannot store value for '{field}': {reason}")]
    Conversion {
        /// Field name
        field: String,
        /// What went wrong
        reason: String,
    },

    /// A row the adapter expected to exist is gone
    #[error("{model} with pk '{pk}' does not exist")]
    Missing {
        /// Model name
        model: String,
        /// Primary key value
        pk: String,
    },
}
