//! Declarative mutation definitions
//!
//! A catalog file lists models (backed by in-memory stores) and the mutations
//! built over them:
//!
//! ```yaml
//! models:
//!   - name: Book
//!     relay: true
//!     fields:
//!       - { name: id, kind: id, primary_key: true }
//!       - { name: title, kind: string, required: true, max_length: 200 }
//! mutations:
//!   - name: CreateBook
//!     model: Book
//!     fields: [title]
//!     permissions: [authenticated]
//!   - name: DeleteBook
//!     model: Book
//!     deleting: true
//!     relay: true
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::auth::PermissionSpec;
use crate::errors::{ConfigResult, ConfigurationError};
use crate::model::{MemoryModel, ModelField};
use crate::mutation::{FieldSelection, ModelMutation};
use crate::registry::{ModelType, Registry};

/// Options of one model mutation, mirroring [`ModelMutation::builder`].
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MutationOptions {
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub fields: FieldSelection,
    #[serde(default)]
    pub permissions: Vec<PermissionSpec>,
    #[serde(default)]
    pub return_field_name: Option<String>,
    #[serde(default)]
    pub deleting: bool,
    #[serde(default)]
    pub relay: bool,
}

impl MutationOptions {
    pub fn build(self, registry: &Registry) -> ConfigResult<ModelMutation> {
        let mut builder = ModelMutation::builder(self.name)
            .fields(self.fields)
            .deleting(self.deleting)
            .relay(self.relay);

        if let Some(model_name) = self.model {
            let model = registry
                .get_model(&model_name)
                .ok_or(ConfigurationError::UnknownModel(model_name))?;
            builder = builder.model(model);
        }
        if let Some(name) = self.return_field_name {
            builder = builder.return_field_name(name);
        }
        for permission in self.permissions {
            builder = builder.permission(permission.into_permission());
        }
        builder.build(registry)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ModelDefinition {
    pub name: String,
    pub fields: Vec<ModelField>,
    /// Output type name; defaults to the model name
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub relay: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Catalog {
    #[serde(default)]
    pub models: Vec<ModelDefinition>,
    #[serde(default)]
    pub mutations: Vec<MutationOptions>,
}

impl Catalog {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse mutation catalog")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Registry with one in-memory model per definition.
    pub fn registry(&self) -> Registry {
        let mut registry = Registry::new();
        for definition in &self.models {
            let model = Arc::new(MemoryModel::new(
                definition.name.clone(),
                definition.fields.clone(),
            ));
            let mut model_type = ModelType::new(model);
            if let Some(type_name) = &definition.type_name {
                model_type = model_type.named(type_name.clone());
            }
            if definition.relay {
                model_type = model_type.relay_node();
            }
            registry.register(model_type);
        }
        registry
    }

    pub fn build_mutations(&self, registry: &Registry) -> ConfigResult<Vec<ModelMutation>> {
        self.mutations
            .iter()
            .cloned()
            .map(|options| options.build(registry))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Actor;
    use crate::model::{FieldKind, FieldValues, Model};
    use serde_json::json;

    const CATALOG: &str = r#"
models:
  - name: Book
    relay: true
    fields:
      - { name: id, kind: id, primary_key: true }
      - { name: title, kind: string, required: true, max_length: 200 }
      - { name: pages, kind: int }
mutations:
  - name: CreateBook
    model: Book
    fields: [title, pages]
    permissions: [authenticated]
  - name: DeleteBook
    model: Book
    deleting: true
    relay: true
"#;

    #[test]
    fn parses_models_and_mutations() {
        let catalog = Catalog::from_yaml(CATALOG).unwrap();
        assert_eq!(catalog.models[0].fields[1].kind, FieldKind::String);
        assert_eq!(catalog.models[0].fields[1].max_length, Some(200));
        assert_eq!(
            catalog.mutations[0].fields,
            FieldSelection::only(["title", "pages"])
        );
        assert_eq!(catalog.mutations[1].fields, FieldSelection::All);
    }

    #[test]
    fn builds_mutations_against_registry() {
        let catalog = Catalog::from_yaml(CATALOG).unwrap();
        let registry = catalog.registry();
        let mutations = catalog.build_mutations(&registry).unwrap();

        assert_eq!(mutations.len(), 2);
        assert_eq!(mutations[0].config().permissions.len(), 1);
        assert!(mutations[1].config().deleting);
    }

    #[tokio::test]
    async fn models_without_primary_key_update_and_delete_by_id() {
        let catalog = Catalog::from_yaml(
            r#"
models:
  - name: Book
    fields:
      - { name: title, kind: string, required: true }
      - { name: author, kind: string }
mutations:
  - name: SaveBook
    model: Book
  - name: DeleteBook
    model: Book
    deleting: true
"#,
        )
        .unwrap();
        let registry = catalog.registry();
        let mutations = catalog.build_mutations(&registry).unwrap();
        let books = registry.get_model("Book").unwrap();
        let actor = Actor::anonymous();
        let input = |value: serde_json::Value| -> FieldValues {
            serde_json::from_value(value).unwrap()
        };

        mutations[0]
            .execute(&actor, input(json!({"title": "Old", "author": "A"})))
            .await
            .unwrap();
        let payload = mutations[0]
            .execute(&actor, input(json!({"id": "1", "title": "New"})))
            .await
            .unwrap();
        let book = payload.record("book").unwrap();
        assert_eq!(book.get("id"), Some(&json!(1)));
        assert_eq!(book.get("author"), Some(&json!("A")));
        assert!(books.get(&json!(2)).await.unwrap().is_none());

        let payload = mutations[1]
            .execute(&actor, input(json!({"id": 1})))
            .await
            .unwrap();
        assert_eq!(payload.record("book").unwrap().get("title"), Some(&json!("New")));
        assert!(books.get(&json!(1)).await.unwrap().is_none());
    }

    #[test]
    fn unknown_model_is_reported() {
        let options = MutationOptions {
            name: "CreateAuthor".to_string(),
            model: Some("Author".to_string()),
            fields: FieldSelection::All,
            permissions: Vec::new(),
            return_field_name: None,
            deleting: false,
            relay: false,
        };
        let err = options.build(&Registry::new()).unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownModel("Author".to_string()));
    }
}
