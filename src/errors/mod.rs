//! Error types for mutation configuration, execution, and persistence
//!
//! # Error Categories
//!
//! - **ConfigurationError**: raised once, while a mutation is being built
//! - **MutationError**: top-level request failures (permission, lookup, decoding)
//! - **StoreError**: failures reported by a persistence adapter
//!
//! Form validation failures are not errors at all: they travel back to the
//! caller as data inside the mutation payload.
//!
//! # Examples
//!
//! ```rust
//! use model_mutation::errors::{ConfigurationError, MutationError};
//!
//! let err = ConfigurationError::MissingModel("CreateBook".to_string());
//! assert!(err.to_string().contains("CreateBook"));
//!
//! let err = MutationError::PermissionDenied("not authenticated".to_string());
//! assert_eq!(err.error_code(), "FORBIDDEN");
//! ```

pub mod common;
pub mod configuration;
pub mod mutation;
pub mod store;

pub use common::ToGraphQLError;
pub use configuration::ConfigurationError;
pub use mutation::MutationError;
pub use store::StoreError;

/// Result type alias for mutation definitions
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Result type alias for mutation execution
pub type MutationResult<T> = Result<T, MutationError>;

/// Result type alias for persistence adapters
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_result_alias() {
        let result: ConfigResult<()> = Err(ConfigurationError::MissingForm("Contact".into()));
        assert!(result.is_err());
    }

    #[test]
    fn test_store_error_converts_into_mutation_error() {
        let err: MutationError = StoreError::Conversion {
            field: "pages".to_string(),
            reason: "expected integer".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }
}
