//! Create, update, and delete mutations derived from a model
//!
//! ```rust
//! use std::sync::Arc;
//! use model_mutation::model::{FieldKind, MemoryModel, Model, ModelField};
//! use model_mutation::mutation::ModelMutation;
//! use model_mutation::registry::{ModelType, Registry};
//!
//! let books: Arc<dyn Model> = Arc::new(MemoryModel::new(
//!     "Book",
//!     vec![ModelField::auto_id(), ModelField::new("title", FieldKind::String).required()],
//! ));
//! let mut registry = Registry::new();
//! registry.register(ModelType::new(books.clone()));
//!
//! let mutation = ModelMutation::builder("CreateBook")
//!     .model(books)
//!     .build(&registry)
//!     .unwrap();
//! assert_eq!(mutation.config().return_field_name, "book");
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::base::{self, FormMutate};
use super::{
    fields_for_form, ErrorType, FieldSelection, InputField, MutationPayload, OutputField,
};
use crate::auth::{Actor, Permission, PermissionGate};
use crate::errors::{ConfigResult, ConfigurationError, MutationResult};
use crate::form::{BoundForm, FormClass, ModelForm};
use crate::model::{pk_to_string, FieldKind, FieldValues, Model};
use crate::naming::{is_valid_type_name, lower_first};
use crate::registry::Registry;
use crate::relay::normalize_global_ids;

/// Immutable options of a built model mutation.
pub struct MutationConfig {
    /// Type-style mutation name, e.g. `CreateBook`
    pub name: String,
    pub form: Arc<dyn FormClass>,
    pub model: Arc<dyn Model>,
    pub fields: FieldSelection,
    pub return_field_name: String,
    pub deleting: bool,
    /// Whether `id` inputs are Relay global IDs
    pub relay: bool,
    pub permissions: PermissionGate,
}

impl std::fmt::Debug for MutationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationConfig")
            .field("name", &self.name)
            .field("form", &self.form.name())
            .field("model", &self.model.name())
            .field("fields", &self.fields)
            .field("return_field_name", &self.return_field_name)
            .field("deleting", &self.deleting)
            .field("relay", &self.relay)
            .field("permissions", &self.permissions)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ModelMutation {
    config: Arc<MutationConfig>,
    input_fields: Arc<Vec<InputField>>,
    output_field: OutputField,
}

pub struct ModelMutationBuilder {
    name: String,
    form: Option<Arc<dyn FormClass>>,
    model: Option<Arc<dyn Model>>,
    fields: FieldSelection,
    permissions: Vec<Arc<dyn Permission>>,
    return_field_name: Option<String>,
    deleting: bool,
    relay: bool,
}

impl ModelMutationBuilder {
    pub fn form(mut self, form: Arc<dyn FormClass>) -> Self {
        self.form = Some(form);
        self
    }

    pub fn model(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn fields(mut self, fields: FieldSelection) -> Self {
        self.fields = fields;
        self
    }

    pub fn permission(mut self, permission: Arc<dyn Permission>) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn return_field_name(mut self, name: impl Into<String>) -> Self {
        self.return_field_name = Some(name.into());
        self
    }

    pub fn deleting(mut self, deleting: bool) -> Self {
        self.deleting = deleting;
        self
    }

    pub fn relay(mut self, relay: bool) -> Self {
        self.relay = relay;
        self
    }

    pub fn build(self, registry: &Registry) -> ConfigResult<ModelMutation> {
        if !is_valid_type_name(&self.name) {
            return Err(ConfigurationError::InvalidName(self.name));
        }

        let model = self
            .model
            .or_else(|| self.form.as_ref().and_then(|form| form.model()))
            .ok_or_else(|| ConfigurationError::MissingModel(self.name.clone()))?;

        let form: Arc<dyn FormClass> = match self.form {
            Some(form) => form,
            None => Arc::new(ModelForm::for_model(Arc::clone(&model), &self.fields)?),
        };

        let mut input_fields = if self.deleting {
            Vec::new()
        } else {
            fields_for_form(form.as_ref(), &self.fields)
        };

        if self.fields.is_all() || self.fields.contains("id") || self.deleting {
            let kind = if self.relay {
                FieldKind::GlobalId
            } else {
                FieldKind::Id
            };
            let id_field = InputField::new("id", kind, false);
            match input_fields.iter_mut().find(|field| field.name == "id") {
                Some(existing) => *existing = id_field,
                None => input_fields.push(id_field),
            }
        }

        let model_type = registry
            .get_type_for_model(model.name())
            .ok_or_else(|| ConfigurationError::UnregisteredType(model.name().to_string()))?;

        let return_field_name = self
            .return_field_name
            .unwrap_or_else(|| lower_first(model.name()));

        let output_field = OutputField {
            name: return_field_name.clone(),
            graphql_name: return_field_name.clone(),
            type_name: model_type.type_name().to_string(),
        };

        debug!(
            "Built {} over {} ({} input fields, returns {})",
            self.name,
            model.name(),
            input_fields.len(),
            return_field_name
        );

        Ok(ModelMutation {
            config: Arc::new(MutationConfig {
                name: self.name,
                form,
                model,
                fields: self.fields,
                return_field_name,
                deleting: self.deleting,
                relay: self.relay,
                permissions: PermissionGate::new(self.permissions),
            }),
            input_fields: Arc::new(input_fields),
            output_field,
        })
    }
}

impl ModelMutation {
    pub fn builder(name: impl Into<String>) -> ModelMutationBuilder {
        ModelMutationBuilder {
            name: name.into(),
            form: None,
            model: None,
            fields: FieldSelection::All,
            permissions: Vec::new(),
            return_field_name: None,
            deleting: false,
            relay: false,
        }
    }

    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    pub fn input_fields(&self) -> &[InputField] {
        &self.input_fields
    }

    /// The single payload field carrying the record.
    pub fn output_field(&self) -> &OutputField {
        &self.output_field
    }

    #[instrument(skip(self, actor, input), fields(mutation = %self.config.name))]
    pub async fn execute(
        &self,
        actor: &Actor,
        input: FieldValues,
    ) -> MutationResult<MutationPayload> {
        let input = if self.config.relay {
            normalize_global_ids(self.config.model.as_ref(), &input)?
        } else {
            input
        };

        if let Err(err) = self.config.permissions.check(actor) {
            warn!("{} denied: {}", self.config.name, err);
            return Err(err);
        }

        if self.config.deleting {
            let id = input.get("id").cloned().unwrap_or(Value::Null);
            return self.perform_delete_mutate(&id).await;
        }

        base::mutate_and_get_payload(
            self,
            self.config.form.as_ref(),
            Some(&self.config.model),
            input,
        )
        .await
    }

    async fn perform_delete_mutate(&self, id: &Value) -> MutationResult<MutationPayload> {
        let model = &self.config.model;
        let Some(record) = model.get(id).await? else {
            debug!("{} {} not found for delete", model.name(), pk_to_string(id));
            return Ok(MutationPayload::failure(ErrorType::not_found()));
        };

        model.delete(&record).await?;
        info!("Deleted {} {}", model.name(), pk_to_string(id));
        Ok(MutationPayload::success(
            self.config.return_field_name.as_str(),
            record,
        ))
    }
}

#[async_trait]
impl FormMutate for ModelMutation {
    async fn perform_mutate(&self, form: &mut dyn BoundForm) -> MutationResult<MutationPayload> {
        let record = form.save().await?;
        info!(
            "Saved {} {}",
            self.config.model.name(),
            record
                .get(self.config.model.primary_key())
                .map(pk_to_string)
                .unwrap_or_default()
        );
        Ok(MutationPayload::success(
            self.config.return_field_name.as_str(),
            record,
        ))
    }

    fn invalid_payload(&self, form: &dyn BoundForm) -> MutationPayload {
        MutationPayload::failure(ErrorType::from_errors(form.errors()))
    }
}
