//! Persisted entities as seen by the mutation layer
//!
//! A [`Model`] is the persistence contract: look a row up by primary key, save
//! a row (insert when it has no primary key, update otherwise) and delete a
//! row. Rows travel as [`Record`]s, ordered maps of JSON values.

pub mod memory;
#[cfg(feature = "database")]
pub mod sea;

use async_graphql::dynamic::TypeRef;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StoreResult;

pub use memory::MemoryModel;
#[cfg(feature = "database")]
pub use sea::SeaOrmModel;

/// Submitted or stored values keyed by field name.
pub type FieldValues = IndexMap<String, Value>;

/// Scalar kinds a field may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Raw identifier
    Id,
    /// Relay-style encoded identifier
    GlobalId,
    Int,
    Float,
    Boolean,
    String,
}

impl FieldKind {
    /// GraphQL scalar used for this kind.
    pub fn scalar(&self) -> &'static str {
        match self {
            FieldKind::Id | FieldKind::GlobalId => TypeRef::ID,
            FieldKind::Int => TypeRef::INT,
            FieldKind::Float => TypeRef::FLOAT,
            FieldKind::Boolean => TypeRef::BOOLEAN,
            FieldKind::String => TypeRef::STRING,
        }
    }
}

/// A column of a model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelField {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Read-only fields are stored and output but never accepted as input
    #[serde(default = "default_editable")]
    pub editable: bool,
}

fn default_editable() -> bool {
    true
}

impl ModelField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            primary_key: false,
            max_length: None,
            editable: true,
        }
    }

    /// Auto-assigned integer primary key named `id`.
    pub fn auto_id() -> Self {
        Self {
            primary_key: true,
            ..Self::new("id", FieldKind::Id)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Primary keys are assigned by the store and never edited through forms.
    pub fn is_editable(&self) -> bool {
        self.editable && !self.primary_key
    }
}

/// One persisted row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: FieldValues,
}

impl Record {
    pub fn new(values: FieldValues) -> Self {
        Self { values }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.values.insert(field.into(), value);
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn into_values(self) -> FieldValues {
        self.values
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone().into_iter().collect())
    }
}

impl From<FieldValues> for Record {
    fn from(values: FieldValues) -> Self {
        Self::new(values)
    }
}

/// Persistence contract consumed by mutations.
#[async_trait]
pub trait Model: Send + Sync {
    /// Type-style model name, e.g. `Book`.
    fn name(&self) -> &str;

    fn fields(&self) -> &[ModelField];

    fn primary_key(&self) -> &str {
        self.fields()
            .iter()
            .find(|field| field.primary_key)
            .map(|field| field.name.as_str())
            .unwrap_or("id")
    }

    fn field(&self, name: &str) -> Option<&ModelField> {
        self.fields().iter().find(|field| field.name == name)
    }

    /// `Ok(None)` when no row has this primary key.
    async fn get(&self, pk: &Value) -> StoreResult<Option<Record>>;

    /// Insert when the record carries no primary key, update otherwise.
    async fn save(&self, record: Record) -> StoreResult<Record>;

    async fn delete(&self, record: &Record) -> StoreResult<()>;
}

/// Editable field values of a record, in model field order.
pub fn model_to_dict(model: &dyn Model, record: &Record) -> FieldValues {
    model
        .fields()
        .iter()
        .filter(|field| field.is_editable())
        .filter_map(|field| {
            record
                .get(&field.name)
                .map(|value| (field.name.clone(), value.clone()))
        })
        .collect()
}

/// Mirrors truthiness of a submitted identifier: null, empty and zero count as absent.
pub fn is_present_pk(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// Render a primary key value for messages and GraphQL IDs.
pub fn pk_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn books() -> MemoryModel {
        MemoryModel::new(
            "Book",
            vec![
                ModelField::auto_id(),
                ModelField::new("title", FieldKind::String).required(),
                ModelField::new("author", FieldKind::String),
            ],
        )
    }

    #[test]
    fn model_to_dict_skips_primary_key() {
        let model = books();
        let record = Record::new(IndexMap::from([
            ("id".to_string(), json!(1)),
            ("title".to_string(), json!("Old")),
            ("author".to_string(), json!("A")),
        ]));

        let dict = model_to_dict(&model, &record);
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["title", "author"]);
    }

    #[test]
    fn pk_presence_follows_truthiness() {
        assert!(!is_present_pk(&Value::Null));
        assert!(!is_present_pk(&json!("")));
        assert!(!is_present_pk(&json!(0)));
        assert!(is_present_pk(&json!("0")));
        assert!(is_present_pk(&json!(12)));
    }

    #[test]
    fn primary_key_defaults_to_flagged_field() {
        let model = books();
        assert_eq!(model.primary_key(), "id");
        assert_eq!(FieldKind::GlobalId.scalar(), "ID");
    }
}
