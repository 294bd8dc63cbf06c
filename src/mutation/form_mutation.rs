//! Mutations that validate and save a form
//!
//! The form's fields are both the inputs and the outputs: a successful
//! request echoes the cleaned data, a failed one the submitted data alongside
//! the errors.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::base::{self, FormMutate};
use super::{fields_for_form, ErrorType, FieldSelection, InputField, MutationPayload, OutputField};
use crate::auth::{Actor, Permission, PermissionGate};
use crate::errors::{ConfigResult, ConfigurationError, MutationResult};
use crate::form::{BoundForm, FormClass};
use crate::model::{FieldValues, Model};
use crate::naming::is_valid_type_name;

#[derive(Clone)]
pub struct FormMutation {
    name: String,
    form: Arc<dyn FormClass>,
    model: Option<Arc<dyn Model>>,
    permissions: PermissionGate,
    fields: Arc<Vec<InputField>>,
}

pub struct FormMutationBuilder {
    name: String,
    form: Option<Arc<dyn FormClass>>,
    only_fields: Vec<String>,
    exclude_fields: Vec<String>,
    permissions: Vec<Arc<dyn Permission>>,
}

impl FormMutationBuilder {
    pub fn form(mut self, form: Arc<dyn FormClass>) -> Self {
        self.form = Some(form);
        self
    }

    /// Restrict inputs and outputs to these fields; empty keeps them all.
    pub fn only_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only_fields = names.into_iter().map(Into::into).collect();
        self
    }

    /// Accepted for compatibility; the field list is not filtered by it.
    pub fn exclude_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_fields = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn permission(mut self, permission: Arc<dyn Permission>) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn build(self) -> ConfigResult<FormMutation> {
        if !is_valid_type_name(&self.name) {
            return Err(ConfigurationError::InvalidName(self.name));
        }
        let form = self
            .form
            .ok_or_else(|| ConfigurationError::MissingForm(self.name.clone()))?;

        if !self.exclude_fields.is_empty() {
            warn!(
                "{}: exclude_fields {:?} has no effect on form mutations",
                self.name, self.exclude_fields
            );
        }

        let selection = if self.only_fields.is_empty() {
            FieldSelection::All
        } else {
            FieldSelection::Only(self.only_fields)
        };
        let fields = fields_for_form(form.as_ref(), &selection);

        Ok(FormMutation {
            name: self.name,
            model: form.model(),
            form,
            permissions: PermissionGate::new(self.permissions),
            fields: Arc::new(fields),
        })
    }
}

impl FormMutation {
    pub fn builder(name: impl Into<String>) -> FormMutationBuilder {
        FormMutationBuilder {
            name: name.into(),
            form: None,
            only_fields: Vec::new(),
            exclude_fields: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn form(&self) -> &Arc<dyn FormClass> {
        &self.form
    }

    pub fn input_fields(&self) -> &[InputField] {
        &self.fields
    }

    pub fn output_fields(&self) -> Vec<OutputField> {
        self.fields
            .iter()
            .map(|field| OutputField {
                name: field.name.clone(),
                graphql_name: field.graphql_name.clone(),
                type_name: field.kind.scalar().to_string(),
            })
            .collect()
    }

    fn exposed(&self, values: &FieldValues) -> FieldValues {
        values
            .iter()
            .filter(|(name, _)| self.fields.iter().any(|field| &field.name == *name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    #[instrument(skip(self, actor, input), fields(mutation = %self.name))]
    pub async fn execute(
        &self,
        actor: &Actor,
        input: FieldValues,
    ) -> MutationResult<MutationPayload> {
        if let Err(err) = self.permissions.check(actor) {
            warn!("{} denied: {}", self.name, err);
            return Err(err);
        }

        base::mutate_and_get_payload(self, self.form.as_ref(), self.model.as_ref(), input).await
    }
}

#[async_trait]
impl FormMutate for FormMutation {
    async fn perform_mutate(&self, form: &mut dyn BoundForm) -> MutationResult<MutationPayload> {
        form.save().await?;
        info!("{} saved", self.form.name());
        Ok(MutationPayload::default().with_values(&self.exposed(form.cleaned_data())))
    }

    fn invalid_payload(&self, form: &dyn BoundForm) -> MutationPayload {
        MutationPayload::failure(ErrorType::from_errors(form.errors()))
            .with_values(&self.exposed(form.data()))
    }
}
