//! GraphQL conversion of domain errors
//!
//! # Examples
//!
//! ```rust
//! use model_mutation::errors::common::ToGraphQLError;
//! use model_mutation::errors::MutationError;
//!
//! let err = MutationError::InvalidGlobalId("???".to_string());
//! let graphql_err = err.to_graphql_error();
//! assert!(graphql_err.message.contains("???"));
//! ```

use async_graphql::Error as GraphQLError;

/// Convert domain errors to GraphQL errors with error codes
pub trait ToGraphQLError {
    /// Convert to GraphQL error with structured extensions
    fn to_graphql_error(&self) -> GraphQLError;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MutationError;
    use async_graphql::Value;

    fn code_of(err: &dyn ToGraphQLError) -> Option<Value> {
        err.to_graphql_error()
            .extensions
            .and_then(|extensions| extensions.get("code").cloned())
    }

    #[test]
    fn mutation_errors_carry_codes() {
        assert_eq!(
            code_of(&MutationError::PermissionDenied("no".into())),
            Some(Value::from("FORBIDDEN"))
        );
        assert_eq!(
            code_of(&MutationError::InvalidInput("bad".into())),
            Some(Value::from("BAD_REQUEST"))
        );
    }
}
