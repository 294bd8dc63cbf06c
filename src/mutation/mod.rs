//! Mutations derived from models and forms
//!
//! - [`base`]: the request lifecycle shared by every mutation
//! - [`ModelMutation`]: create/update/delete of a model's records
//! - [`FormMutation`]: validate and save a form, echoing its cleaned data
//! - [`graphql`]: registration on an `async_graphql` dynamic schema

pub mod base;
pub mod form_mutation;
pub mod graphql;
pub mod model_mutation;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::form::{FieldErrors, FormClass, NON_FIELD_ERRORS};
use crate::model::{FieldKind, FieldValues, Record};
use crate::naming::to_camel_case;

pub use form_mutation::{FormMutation, FormMutationBuilder};
pub use graphql::{build_schema, SchemaMutation};
pub use model_mutation::{ModelMutation, ModelMutationBuilder, MutationConfig};

pub const ALL_FIELDS: &str = "__all__";
pub const NOT_FOUND_MESSAGE: &str = "Not found.";

/// Which fields a mutation exposes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSelection", into = "RawSelection")]
pub enum FieldSelection {
    #[default]
    All,
    Only(Vec<String>),
}

impl FieldSelection {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelection::Only(names.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, FieldSelection::All)
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            FieldSelection::All => true,
            FieldSelection::Only(names) => names.iter().any(|n| n == name),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Keyword(String),
    Names(Vec<String>),
}

impl TryFrom<RawSelection> for FieldSelection {
    type Error = String;

    fn try_from(raw: RawSelection) -> Result<Self, Self::Error> {
        match raw {
            RawSelection::Keyword(keyword) if keyword == ALL_FIELDS => Ok(FieldSelection::All),
            RawSelection::Keyword(other) => Err(format!(
                "expected \"{}\" or a list of field names, got {:?}",
                ALL_FIELDS, other
            )),
            RawSelection::Names(names) => Ok(FieldSelection::Only(names)),
        }
    }
}

impl From<FieldSelection> for RawSelection {
    fn from(selection: FieldSelection) -> Self {
        match selection {
            FieldSelection::All => RawSelection::Keyword(ALL_FIELDS.to_string()),
            FieldSelection::Only(names) => RawSelection::Names(names),
        }
    }
}

/// An input argument field of a generated mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputField {
    /// Form or model field name
    pub name: String,
    /// Name in the GraphQL schema
    pub graphql_name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl InputField {
    pub fn new(name: impl Into<String>, kind: FieldKind, required: bool) -> Self {
        let name = name.into();
        Self {
            graphql_name: to_camel_case(&name),
            name,
            kind,
            required,
        }
    }
}

/// An output field of a generated mutation payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputField {
    pub name: String,
    pub graphql_name: String,
    /// Name of the GraphQL type the field resolves to
    pub type_name: String,
}

/// Form fields kept by `selection`, in form order.
pub fn fields_for_form(form: &dyn FormClass, selection: &FieldSelection) -> Vec<InputField> {
    form.fields()
        .iter()
        .filter(|field| selection.contains(&field.name))
        .map(|field| InputField::new(field.name.clone(), field.kind, field.required))
        .collect()
}

/// A validation failure as exposed to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorType {
    pub field: String,
    pub messages: Vec<String>,
}

impl ErrorType {
    pub fn new(field: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            field: field.into(),
            messages,
        }
    }

    /// Field names are camel-cased to match the schema; form-wide errors keep `__all__`.
    pub fn from_errors(errors: &FieldErrors) -> Vec<ErrorType> {
        errors
            .iter()
            .map(|(field, messages)| {
                let field = if field == NON_FIELD_ERRORS {
                    field.clone()
                } else {
                    to_camel_case(field)
                };
                ErrorType::new(field, messages.clone())
            })
            .collect()
    }

    pub fn not_found() -> Vec<ErrorType> {
        vec![ErrorType::new("id", vec![NOT_FOUND_MESSAGE.to_string()])]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OutputValue {
    Record(Record),
    Value(Value),
}

/// Result of one mutation request.
///
/// A successful payload has no errors and carries its outputs; a failed model
/// mutation payload carries errors only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutationPayload {
    pub errors: Vec<ErrorType>,
    pub outputs: IndexMap<String, OutputValue>,
    pub client_mutation_id: Option<String>,
}

impl MutationPayload {
    pub fn success(field: impl Into<String>, record: Record) -> Self {
        let mut outputs = IndexMap::new();
        outputs.insert(field.into(), OutputValue::Record(record));
        Self {
            outputs,
            ..Self::default()
        }
    }

    pub fn failure(errors: Vec<ErrorType>) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }

    /// Attach plain values, one output per entry.
    pub fn with_values(mut self, values: &FieldValues) -> Self {
        for (name, value) in values {
            self.outputs
                .insert(name.clone(), OutputValue::Value(value.clone()));
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn output(&self, name: &str) -> Option<&OutputValue> {
        self.outputs.get(name)
    }

    pub fn record(&self, name: &str) -> Option<&Record> {
        match self.outputs.get(name) {
            Some(OutputValue::Record(record)) => Some(record),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "errors".to_string(),
            serde_json::to_value(&self.errors).unwrap_or(Value::Null),
        );
        for (name, output) in &self.outputs {
            let value = match output {
                OutputValue::Record(record) => record.to_json(),
                OutputValue::Value(value) => value.clone(),
            };
            map.insert(name.clone(), value);
        }
        if let Some(id) = &self.client_mutation_id {
            map.insert("clientMutationId".to_string(), Value::String(id.clone()));
        }
        Value::Object(map)
    }
}
