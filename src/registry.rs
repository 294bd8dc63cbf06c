//! Output types registered per model
//!
//! Every model a mutation returns needs an output object type. The registry
//! maps model names to [`ModelType`]s and renders them, together with the
//! shared `ErrorType` object, onto a dynamic schema.

use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Object, SchemaBuilder, TypeRef,
};
use async_graphql::{Error, Value as GqlValue};
use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::ToGraphQLError;
use crate::model::{pk_to_string, Model, Record};
use crate::mutation::ErrorType;
use crate::naming::{lower_first, to_camel_case};
use crate::relay::{from_global_id, to_global_id};

pub const ERROR_TYPE: &str = "ErrorType";

/// Output object type of a model.
#[derive(Clone)]
pub struct ModelType {
    model: Arc<dyn Model>,
    type_name: String,
    relay_node: bool,
}

impl ModelType {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            type_name: model.name().to_string(),
            model,
            relay_node: false,
        }
    }

    pub fn named(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Expose the primary key as a Relay global ID.
    pub fn relay_node(mut self) -> Self {
        self.relay_node = true;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn model(&self) -> &Arc<dyn Model> {
        &self.model
    }

    pub fn is_relay_node(&self) -> bool {
        self.relay_node
    }

    /// Primary key as exposed through this type.
    pub fn output_id(&self, pk: &Value) -> String {
        if self.relay_node {
            to_global_id(&self.type_name, &pk_to_string(pk))
        } else {
            pk_to_string(pk)
        }
    }

    pub fn object(&self) -> Object {
        let pk_name = self.model.primary_key().to_string();
        let mut object = Object::new(self.type_name.as_str());

        for field in self.model.fields() {
            let name = field.name.clone();
            let type_ref = if field.primary_key || field.required {
                TypeRef::named_nn(field.kind.scalar())
            } else {
                TypeRef::named(field.kind.scalar())
            };

            let resolver = if name == pk_name {
                let model_type = self.clone();
                Field::new(to_camel_case(&name), type_ref, move |ctx| {
                    let model_type = model_type.clone();
                    let name = name.clone();
                    FieldFuture::new(async move {
                        let record = ctx.parent_value.try_downcast_ref::<Record>()?;
                        Ok(record
                            .get(&name)
                            .filter(|pk| !pk.is_null())
                            .map(|pk| FieldValue::value(model_type.output_id(pk))))
                    })
                })
            } else {
                Field::new(to_camel_case(&name), type_ref, move |ctx| {
                    let name = name.clone();
                    FieldFuture::new(async move {
                        let record = ctx.parent_value.try_downcast_ref::<Record>()?;
                        match record.get(&name) {
                            None | Some(Value::Null) => Ok(None),
                            Some(value) => Ok(Some(FieldValue::value(GqlValue::from_json(
                                value.clone(),
                            )?))),
                        }
                    })
                })
            };
            object = object.field(resolver);
        }
        object
    }

    /// `<type>(id: ID!): <Type>` lookup for the query root.
    fn lookup_field(&self) -> Field {
        let model_type = self.clone();
        Field::new(
            lower_first(&self.type_name),
            TypeRef::named(self.type_name.as_str()),
            move |ctx| {
                let model_type = model_type.clone();
                FieldFuture::new(async move {
                    let id = ctx.args.try_get("id")?.string()?.to_string();
                    let pk = if model_type.relay_node {
                        from_global_id(&id)
                            .map_err(|e| e.to_graphql_error())?
                            .id
                    } else {
                        id
                    };
                    let record = model_type
                        .model
                        .get(&Value::String(pk))
                        .await
                        .map_err(|e| Error::new(e.to_string()))?;
                    Ok(record.map(FieldValue::owned_any))
                })
            },
        )
        .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID)))
    }
}

/// Model name -> output type.
#[derive(Clone, Default)]
pub struct Registry {
    types: IndexMap<String, ModelType>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model_type: ModelType) -> &mut Self {
        self.types
            .insert(model_type.model.name().to_string(), model_type);
        self
    }

    pub fn get_type_for_model(&self, model_name: &str) -> Option<&ModelType> {
        self.types.get(model_name)
    }

    pub fn get_model(&self, model_name: &str) -> Option<Arc<dyn Model>> {
        self.types
            .get(model_name)
            .map(|model_type| Arc::clone(&model_type.model))
    }

    pub fn types(&self) -> impl Iterator<Item = &ModelType> {
        self.types.values()
    }

    /// Register `ErrorType` and every model object on `builder`.
    pub fn register_types(&self, mut builder: SchemaBuilder) -> SchemaBuilder {
        builder = builder.register(error_type_object());
        for model_type in self.types.values() {
            builder = builder.register(model_type.object());
        }
        builder
    }

    /// Query root with one lookup field per registered type.
    pub fn query_root(&self, name: &str) -> Object {
        self.types
            .values()
            .fold(Object::new(name), |query, model_type| {
                query.field(model_type.lookup_field())
            })
    }
}

fn error_type_object() -> Object {
    Object::new(ERROR_TYPE)
        .field(Field::new(
            "field",
            TypeRef::named_nn(TypeRef::STRING),
            |ctx| {
                FieldFuture::new(async move {
                    let error = ctx.parent_value.try_downcast_ref::<ErrorType>()?;
                    Ok(Some(FieldValue::value(error.field.clone())))
                })
            },
        ))
        .field(Field::new(
            "messages",
            TypeRef::named_nn_list_nn(TypeRef::STRING),
            |ctx| {
                FieldFuture::new(async move {
                    let error = ctx.parent_value.try_downcast_ref::<ErrorType>()?;
                    Ok(Some(FieldValue::list(
                        error
                            .messages
                            .iter()
                            .map(|message| FieldValue::value(message.clone())),
                    )))
                })
            },
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldKind, MemoryModel, ModelField};
    use serde_json::json;

    fn books() -> Arc<dyn Model> {
        Arc::new(MemoryModel::new(
            "Book",
            vec![ModelField::auto_id(), ModelField::new("title", FieldKind::String)],
        ))
    }

    #[test]
    fn lookup_by_model_name() {
        let mut registry = Registry::new();
        registry.register(ModelType::new(books()).named("BookNode").relay_node());

        let model_type = registry.get_type_for_model("Book").unwrap();
        assert_eq!(model_type.type_name(), "BookNode");
        assert!(registry.get_type_for_model("Author").is_none());
    }

    #[test]
    fn relay_nodes_expose_global_ids() {
        let plain = ModelType::new(books());
        let node = ModelType::new(books()).relay_node();

        assert_eq!(plain.output_id(&json!(1)), "1");
        assert_eq!(node.output_id(&json!(1)), to_global_id("Book", "1"));
    }
}
