//! Errors raised while a mutation is being defined
//!
//! These surface at startup, when the schema is assembled, and are never
//! recovered from.

use thiserror::Error;

/// Mutation definition errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Neither a model nor a form bound to a model was supplied
    #[error("model is required for model mutation '{0}'")]
    MissingModel(String),

    /// A form mutation was defined without a form
    #[error("form is required for form mutation '{0}'")]
    MissingForm(String),

    /// The model has no output type in the registry
    #[error("No type registered for model: {0}")]
    UnregisteredType(String),

    /// The field selection names fields the model does not have
    #[error("Unknown field(s) ({fields}) specified for {model}")]
    UnknownFields {
        /// Model name
        model: String,
        /// Comma separated unknown field names
        fields: String,
    },

    /// The field selection names a field a synthesized form cannot edit
    #[error("'{field}' cannot be specified for {model} model form as it is a non-editable field")]
    NonEditableField {
        /// Model name
        model: String,
        /// Field name
        field: String,
    },

    /// Options referenced a model the registry does not know about
    #[error("Model '{0}' is not registered")]
    UnknownModel(String),

    /// A mutation name that cannot be used as a GraphQL type name
    #[error("Invalid mutation name: {0:?}")]
    InvalidName(String),
}
