//! Request lifecycle shared by model and form mutations
//!
//! Binding a form pops `id` from the input. When it names an existing record,
//! the form is bound to that record and its data is the record's editable
//! values overlaid with the input, so fields the caller did not send keep
//! their stored values.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::MutationPayload;
use crate::errors::{MutationError, MutationResult};
use crate::form::{BoundForm, FormClass};
use crate::model::{is_present_pk, model_to_dict, pk_to_string, FieldValues, Model};

/// Outcome hooks called once the form has been validated.
#[async_trait]
pub trait FormMutate: Send + Sync {
    async fn perform_mutate(&self, form: &mut dyn BoundForm) -> MutationResult<MutationPayload>;

    fn invalid_payload(&self, form: &dyn BoundForm) -> MutationPayload;
}

/// Bind `form_class` to `input`, loading the record `input["id"]` points at.
pub async fn get_form(
    form_class: &dyn FormClass,
    model: Option<&Arc<dyn Model>>,
    mut input: FieldValues,
) -> MutationResult<Box<dyn BoundForm>> {
    let pk = input.shift_remove("id").filter(is_present_pk);

    let (Some(pk), Some(model)) = (pk, model) else {
        return Ok(form_class.bind(input, None));
    };

    let instance = model
        .get(&pk)
        .await?
        .ok_or_else(|| MutationError::NotFound {
            model: model.name().to_string(),
            pk: pk_to_string(&pk),
        })?;
    debug!("Binding {} to {} {}", form_class.name(), model.name(), pk_to_string(&pk));

    let mut data = model_to_dict(model.as_ref(), &instance);
    data.extend(input);
    Ok(form_class.bind(data, Some(instance)))
}

/// Bind, validate, and dispatch to the success or failure hook.
pub async fn mutate_and_get_payload(
    handler: &dyn FormMutate,
    form_class: &dyn FormClass,
    model: Option<&Arc<dyn Model>>,
    input: FieldValues,
) -> MutationResult<MutationPayload> {
    let mut form = get_form(form_class, model, input).await?;

    if form.is_valid() {
        handler.perform_mutate(&mut *form).await
    } else {
        debug!("{} rejected input: {:?}", form_class.name(), form.errors());
        Ok(handler.invalid_payload(&*form))
    }
}
