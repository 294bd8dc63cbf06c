pub mod auth;
pub mod config;
pub mod errors;
pub mod form;
pub mod model;
pub mod mutation;
pub mod naming;
pub mod registry;
pub mod relay;

pub use auth::Actor;
pub use errors::{ConfigurationError, MutationError};
pub use mutation::{build_schema, FormMutation, ModelMutation, MutationPayload};
pub use registry::{ModelType, Registry};
