//! Forms synthesized from a model
//!
//! [`ModelForm::for_model`] derives one form field per editable model field in
//! the selection. Validation checks presence, coerces values to the field's
//! kind, enforces maximum lengths, then runs any custom validators and the
//! form-wide clean hook.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Number, Value};

use super::{BoundForm, FieldErrors, FormClass, FormField, NON_FIELD_ERRORS};
use crate::errors::{ConfigurationError, ConfigResult, StoreError, StoreResult};
use crate::model::{FieldKind, FieldValues, Model, Record};
use crate::mutation::FieldSelection;

pub const REQUIRED_MESSAGE: &str = "This field is required.";

pub type FieldValidator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;
pub type FormCleaner = Arc<dyn Fn(&FieldValues) -> Result<(), String> + Send + Sync>;

#[derive(Clone)]
pub struct ModelForm {
    name: String,
    model: Arc<dyn Model>,
    fields: Vec<FormField>,
    validators: Vec<(String, FieldValidator)>,
    clean: Option<FormCleaner>,
}

impl ModelForm {
    /// Build a form over `model`'s editable fields, restricted to `selection`.
    pub fn for_model(model: Arc<dyn Model>, selection: &FieldSelection) -> ConfigResult<Self> {
        let fields = match selection {
            FieldSelection::All => model
                .fields()
                .iter()
                .filter(|field| field.is_editable())
                .map(FormField::from)
                .collect(),
            FieldSelection::Only(names) => {
                let mut fields = Vec::with_capacity(names.len());
                let mut unknown = Vec::new();
                for name in names {
                    match model.field(name) {
                        // The auto primary key has no form field; naming it only exposes `id`.
                        Some(field) if field.primary_key => continue,
                        Some(field) if !field.is_editable() => {
                            return Err(ConfigurationError::NonEditableField {
                                model: model.name().to_string(),
                                field: name.clone(),
                            });
                        }
                        Some(field) => fields.push(FormField::from(field)),
                        None => unknown.push(name.as_str()),
                    }
                }
                if !unknown.is_empty() {
                    return Err(ConfigurationError::UnknownFields {
                        model: model.name().to_string(),
                        fields: unknown.join(", "),
                    });
                }
                fields
            }
        };

        Ok(Self {
            name: format!("{}Form", model.name()),
            model,
            fields,
            validators: Vec::new(),
            clean: None,
        })
    }

    pub fn with_validator<F>(mut self, field: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push((field.into(), Arc::new(validator)));
        self
    }

    pub fn with_clean<F>(mut self, clean: F) -> Self
    where
        F: Fn(&FieldValues) -> Result<(), String> + Send + Sync + 'static,
    {
        self.clean = Some(Arc::new(clean));
        self
    }
}

impl FormClass for ModelForm {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> Option<Arc<dyn Model>> {
        Some(Arc::clone(&self.model))
    }

    fn fields(&self) -> &[FormField] {
        &self.fields
    }

    fn bind(&self, data: FieldValues, instance: Option<Record>) -> Box<dyn BoundForm> {
        Box::new(BoundModelForm {
            form: self.clone(),
            data,
            instance,
            errors: FieldErrors::new(),
            cleaned_data: FieldValues::new(),
            validated: false,
        })
    }
}

struct BoundModelForm {
    form: ModelForm,
    data: FieldValues,
    instance: Option<Record>,
    errors: FieldErrors,
    cleaned_data: FieldValues,
    validated: bool,
}

impl BoundModelForm {
    fn full_clean(&mut self) {
        for field in &self.form.fields {
            match clean_field(field, self.data.get(&field.name)) {
                Ok(value) => {
                    let failures: Vec<String> = if value.is_null() {
                        Vec::new()
                    } else {
                        self.form
                            .validators
                            .iter()
                            .filter(|(name, _)| name == &field.name)
                            .filter_map(|(_, validator)| validator(&value).err())
                            .collect()
                    };
                    if failures.is_empty() {
                        self.cleaned_data.insert(field.name.clone(), value);
                    } else {
                        self.errors.insert(field.name.clone(), failures);
                    }
                }
                Err(message) => {
                    self.errors.insert(field.name.clone(), vec![message]);
                }
            }
        }

        if let Some(clean) = &self.form.clean {
            if let Err(message) = clean(&self.cleaned_data) {
                self.errors
                    .entry(NON_FIELD_ERRORS.to_string())
                    .or_default()
                    .push(message);
            }
        }
        self.validated = true;
    }
}

#[async_trait]
impl BoundForm for BoundModelForm {
    fn data(&self) -> &FieldValues {
        &self.data
    }

    fn is_valid(&mut self) -> bool {
        if !self.validated {
            self.full_clean();
        }
        self.errors.is_empty()
    }

    fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    fn cleaned_data(&self) -> &FieldValues {
        &self.cleaned_data
    }

    async fn save(&mut self) -> StoreResult<Record> {
        if !self.is_valid() {
            return Err(StoreError::Conversion {
                field: NON_FIELD_ERRORS.to_string(),
                reason: format!("{} did not validate", self.form.name),
            });
        }

        let mut values = self
            .instance
            .clone()
            .map(Record::into_values)
            .unwrap_or_default();
        for (name, value) in &self.cleaned_data {
            values.insert(name.clone(), value.clone());
        }
        self.form.model.save(Record::new(values)).await
    }
}

fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Validate and coerce one submitted value.
pub fn clean_field(field: &FormField, value: Option<&Value>) -> Result<Value, String> {
    if is_empty_value(value) {
        return if field.required {
            Err(REQUIRED_MESSAGE.to_string())
        } else {
            Ok(Value::Null)
        };
    }
    let value = value.unwrap_or(&Value::Null);

    match field.kind {
        FieldKind::String => {
            let text = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(_) | Value::Bool(_) => value.to_string(),
                _ => return Err("Enter a valid value.".to_string()),
            };
            if let Some(max) = field.max_length {
                let len = text.chars().count();
                if len > max {
                    return Err(format!(
                        "Ensure this value has at most {} characters (it has {}).",
                        max, len
                    ));
                }
            }
            Ok(Value::String(text))
        }
        FieldKind::Int => {
            let parsed = match value {
                // u64 values above i64::MAX fall through to the float check and fail it.
                Value::Number(n) => n.as_i64().or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0)
                        .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                        .map(|f| f as i64)
                }),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| "Enter a whole number.".to_string())
        }
        FieldKind::Float => {
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| "Enter a number.".to_string())
        }
        FieldKind::Boolean => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "off" => Ok(Value::Bool(false)),
                _ => Err("Enter a valid boolean.".to_string()),
            },
            Value::Number(n) if n.as_i64() == Some(0) => Ok(Value::Bool(false)),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(Value::Bool(true)),
            _ => Err("Enter a valid boolean.".to_string()),
        },
        FieldKind::Id | FieldKind::GlobalId => match value {
            Value::String(_) | Value::Number(_) => Ok(value.clone()),
            _ => Err("Enter a valid identifier.".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemoryModel, ModelField};
    use indexmap::IndexMap;
    use serde_json::json;

    fn books() -> Arc<dyn Model> {
        Arc::new(MemoryModel::new(
            "Book",
            vec![
                ModelField::auto_id(),
                ModelField::new("title", FieldKind::String)
                    .required()
                    .max_length(10),
                ModelField::new("author", FieldKind::String),
                ModelField::new("pages", FieldKind::Int),
            ],
        ))
    }

    fn data(pairs: &[(&str, Value)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn all_fields_excludes_primary_key() {
        let form = ModelForm::for_model(books(), &FieldSelection::All).unwrap();
        let names: Vec<_> = form.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["title", "author", "pages"]);
    }

    #[test]
    fn selection_keeps_requested_order() {
        let form =
            ModelForm::for_model(books(), &FieldSelection::only(["pages", "title"])).unwrap();
        let names: Vec<_> = form.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["pages", "title"]);
    }

    #[test]
    fn selecting_primary_key_is_skipped() {
        let form =
            ModelForm::for_model(books(), &FieldSelection::only(["id", "title"])).unwrap();
        let names: Vec<_> = form.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["title"]);
    }

    #[test]
    fn selecting_read_only_field_is_rejected() {
        let model: Arc<dyn Model> = Arc::new(MemoryModel::new(
            "Book",
            vec![
                ModelField::auto_id(),
                ModelField::new("title", FieldKind::String),
                ModelField::new("slug", FieldKind::String).read_only(),
            ],
        ));
        let err = ModelForm::for_model(model, &FieldSelection::only(["title", "slug"]))
            .err()
            .unwrap();
        assert_eq!(
            err,
            ConfigurationError::NonEditableField {
                model: "Book".to_string(),
                field: "slug".to_string(),
            }
        );
    }

    #[test]
    fn unknown_fields_are_reported_together() {
        let err = ModelForm::for_model(books(), &FieldSelection::only(["isbn", "title", "price"]))
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "Unknown field(s) (isbn, price) specified for Book"
        );
    }

    #[test]
    fn bound_form_collects_field_errors() {
        let form = ModelForm::for_model(books(), &FieldSelection::All).unwrap();
        let mut bound = form.bind(
            data(&[("title", json!("A very long title")), ("pages", json!("many"))]),
            None,
        );

        assert!(!bound.is_valid());
        assert_eq!(
            bound.errors().get("title"),
            Some(&vec![
                "Ensure this value has at most 10 characters (it has 17).".to_string()
            ])
        );
        assert_eq!(
            bound.errors().get("pages"),
            Some(&vec!["Enter a whole number.".to_string()])
        );
    }

    #[test]
    fn missing_required_field() {
        let form = ModelForm::for_model(books(), &FieldSelection::All).unwrap();
        let mut bound = form.bind(data(&[("author", json!("A"))]), None);
        assert!(!bound.is_valid());
        assert_eq!(
            bound.errors().get("title"),
            Some(&vec![REQUIRED_MESSAGE.to_string()])
        );
    }

    #[test]
    fn validators_and_clean_hook_run_after_coercion() {
        let form = ModelForm::for_model(books(), &FieldSelection::All)
            .unwrap()
            .with_validator("pages", |value| match value.as_i64() {
                Some(n) if n > 0 => Ok(()),
                _ => Err("Pages must be positive.".to_string()),
            })
            .with_clean(|cleaned| {
                if cleaned.get("author") == Some(&json!("Anonymous")) {
                    Err("Anonymous books are not accepted.".to_string())
                } else {
                    Ok(())
                }
            });

        let mut bound = form.bind(
            data(&[
                ("title", json!("Dune")),
                ("author", json!("Anonymous")),
                ("pages", json!("-3")),
            ]),
            None,
        );
        assert!(!bound.is_valid());
        assert_eq!(
            bound.errors().get("pages"),
            Some(&vec!["Pages must be positive.".to_string()])
        );
        assert_eq!(
            bound.errors().get(NON_FIELD_ERRORS),
            Some(&vec!["Anonymous books are not accepted.".to_string()])
        );
    }

    #[tokio::test]
    async fn save_updates_bound_instance() {
        let model = books();
        let form = ModelForm::for_model(Arc::clone(&model), &FieldSelection::only(["title"])).unwrap();

        let existing = model
            .save(Record::new(IndexMap::from([
                ("title".to_string(), json!("Old")),
                ("author".to_string(), json!("A")),
            ])))
            .await
            .unwrap();

        let mut bound = form.bind(data(&[("title", json!("New"))]), Some(existing));
        assert!(bound.is_valid());
        let saved = bound.save().await.unwrap();

        assert_eq!(saved.get("id"), Some(&json!(1)));
        assert_eq!(saved.get("title"), Some(&json!("New")));
        assert_eq!(saved.get("author"), Some(&json!("A")));
    }

    #[test]
    fn clean_field_coerces_strings() {
        let field = FormField::new("pages", FieldKind::Int);
        assert_eq!(clean_field(&field, Some(&json!(" 42 "))), Ok(json!(42)));

        let flag = FormField::new("in_print", FieldKind::Boolean);
        assert_eq!(clean_field(&flag, Some(&json!("false"))), Ok(json!(false)));
        assert_eq!(clean_field(&flag, None), Ok(Value::Null));
    }

    #[test]
    fn clean_field_rejects_out_of_range_integers() {
        let field = FormField::new("pages", FieldKind::Int);
        let whole_number = Err("Enter a whole number.".to_string());

        assert_eq!(clean_field(&field, Some(&json!(1e20))), whole_number);
        assert_eq!(clean_field(&field, Some(&json!(-1e20))), whole_number);
        assert_eq!(clean_field(&field, Some(&json!(u64::MAX))), whole_number);
        assert_eq!(clean_field(&field, Some(&json!("99999999999999999999"))), whole_number);
        assert_eq!(clean_field(&field, Some(&json!(12.0))), Ok(json!(12)));
        assert_eq!(clean_field(&field, Some(&json!(i64::MAX))), Ok(json!(i64::MAX)));
    }
}
