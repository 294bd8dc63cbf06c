//! Validation forms
//!
//! A [`FormClass`] describes a form (its fields and, for model forms, the model
//! it saves to). Binding it to submitted data yields a [`BoundForm`] that
//! validates, exposes cleaned values and errors, and saves.

pub mod model_form;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::StoreResult;
use crate::model::{FieldKind, FieldValues, Model, ModelField, Record};

pub use model_form::ModelForm;

/// Messages per field name. Form-wide messages use [`NON_FIELD_ERRORS`].
pub type FieldErrors = IndexMap<String, Vec<String>>;

pub const NON_FIELD_ERRORS: &str = "__all__";

/// A field declared on a form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub max_length: Option<usize>,
}

impl FormField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            max_length: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl From<&ModelField> for FormField {
    fn from(field: &ModelField) -> Self {
        Self {
            name: field.name.clone(),
            kind: field.kind,
            required: field.required,
            max_length: field.max_length,
        }
    }
}

pub trait FormClass: Send + Sync {
    fn name(&self) -> &str;

    /// The model a model form saves to; `None` for plain forms.
    fn model(&self) -> Option<Arc<dyn Model>>;

    fn fields(&self) -> &[FormField];

    /// Bind submitted data, optionally to an existing record that `save` updates.
    fn bind(&self, data: FieldValues, instance: Option<Record>) -> Box<dyn BoundForm>;
}

#[async_trait]
pub trait BoundForm: Send {
    /// The data the form was bound with.
    fn data(&self) -> &FieldValues;

    /// Runs validation once; later calls reuse the outcome.
    fn is_valid(&mut self) -> bool;

    fn errors(&self) -> &FieldErrors;

    fn cleaned_data(&self) -> &FieldValues;

    /// Persist the cleaned data. Plain forms have nothing to persist and hand
    /// back their cleaned data.
    async fn save(&mut self) -> StoreResult<Record> {
        Ok(Record::new(self.cleaned_data().clone()))
    }
}
