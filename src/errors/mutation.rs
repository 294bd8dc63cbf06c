//! Request-level mutation errors
//!
//! Only failures that abort a request live here. Validation problems and a
//! missing record on delete are reported inside the payload instead.

use async_graphql::{Error as GraphQLError, ErrorExtensions};
use thiserror::Error;

use super::common::ToGraphQLError;
use super::StoreError;

/// Errors that fail a mutation request as a whole
#[derive(Error, Debug)]
pub enum MutationError {
    /// The permission gate rejected the caller
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// An update referenced a record that does not exist
    #[error("{model} matching query does not exist (pk '{pk}')")]
    NotFound {
        /// Model name
        model: String,
        /// Primary key that was looked up
        pk: String,
    },

    /// The `id` input could not be decoded as a global ID
    #[error("Unable to parse global ID '{0}'")]
    InvalidGlobalId(String),

    /// The mutation input was not an object of field values
    #[error("Invalid mutation input: {0}")]
    InvalidInput(String),

    /// Persistence layer failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MutationError {
    /// Check if the caller caused this error
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MutationError::PermissionDenied(_)
                | MutationError::NotFound { .. }
                | MutationError::InvalidGlobalId(_)
                | MutationError::InvalidInput(_)
        )
    }

    /// Get error code for GraphQL responses
    pub fn error_code(&self) -> &'static str {
        match self {
            MutationError::PermissionDenied(_) => "FORBIDDEN",
            MutationError::NotFound { .. } => "NOT_FOUND",
            MutationError::InvalidGlobalId(_) | MutationError::InvalidInput(_) => "BAD_REQUEST",
            MutationError::Store(_) => "DATABASE_ERROR",
        }
    }
}

impl ToGraphQLError for MutationError {
    fn to_graphql_error(&self) -> GraphQLError {
        let code = self.error_code();
        let message = self.to_string();

        GraphQLError::new(message).extend_with(|_, e| {
            e.set("code", code);

            match self {
                MutationError::NotFound { model, pk } => {
                    e.set("resource", model.as_str());
                    e.set("id", pk.as_str());
                }
                MutationError::InvalidGlobalId(id) => {
                    e.set("id", id.as_str());
                }
                _ => {}
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied() {
        let err = MutationError::PermissionDenied("role 'editor' required".to_string());
        assert_eq!(err.to_string(), "Permission denied: role 'editor' required");
        assert!(err.is_client_error());
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[test]
    fn test_not_found_graphql_extensions() {
        let err = MutationError::NotFound {
            model: "Book".to_string(),
            pk: "7".to_string(),
        };
        let gql = err.to_graphql_error();
        assert!(gql.message.contains("Book"));
        let extensions = gql.extensions.expect("extensions set");
        assert_eq!(
            extensions.get("code"),
            Some(&async_graphql::Value::from("NOT_FOUND"))
        );
    }
}
