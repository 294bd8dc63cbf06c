//! Dynamic GraphQL schema wiring
//!
//! Each mutation contributes an `<Name>Input` input object, a `<Name>Payload`
//! object, and a `<name>(input: <Name>Input!): <Name>Payload!` field on the
//! mutation root. `clientMutationId` is accepted on every input and echoed on
//! every payload. The caller is read from the request data as an [`Actor`];
//! requests without one run as anonymous.

use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ResolverContext, Schema,
    SchemaBuilder, SchemaError, TypeRef,
};
use async_graphql::{Error, Value as GqlValue};
use async_trait::async_trait;

use super::{
    FormMutation, InputField, ModelMutation, MutationPayload, OutputField, OutputValue,
};
use crate::auth::Actor;
use crate::errors::{MutationError, MutationResult, ToGraphQLError};
use crate::model::FieldValues;
use crate::naming::lower_first;
use crate::registry::{Registry, ERROR_TYPE};

pub const CLIENT_MUTATION_ID: &str = "clientMutationId";
pub const QUERY_ROOT: &str = "Query";
pub const MUTATION_ROOT: &str = "Mutation";

/// A mutation that can be mounted on a dynamic schema.
#[async_trait]
pub trait SchemaMutation: Send + Sync {
    /// Type-style name, e.g. `CreateBook`.
    fn type_name(&self) -> &str;

    fn input_fields(&self) -> &[InputField];

    fn output_fields(&self) -> Vec<OutputField>;

    async fn run(&self, actor: Actor, input: FieldValues) -> MutationResult<MutationPayload>;

    fn field_name(&self) -> String {
        lower_first(self.type_name())
    }

    fn input_type_name(&self) -> String {
        format!("{}Input", self.type_name())
    }

    fn payload_type_name(&self) -> String {
        format!("{}Payload", self.type_name())
    }
}

#[async_trait]
impl SchemaMutation for ModelMutation {
    fn type_name(&self) -> &str {
        &self.config().name
    }

    fn input_fields(&self) -> &[InputField] {
        ModelMutation::input_fields(self)
    }

    fn output_fields(&self) -> Vec<OutputField> {
        vec![self.output_field().clone()]
    }

    async fn run(&self, actor: Actor, input: FieldValues) -> MutationResult<MutationPayload> {
        self.execute(&actor, input).await
    }
}

#[async_trait]
impl SchemaMutation for FormMutation {
    fn type_name(&self) -> &str {
        self.name()
    }

    fn input_fields(&self) -> &[InputField] {
        FormMutation::input_fields(self)
    }

    fn output_fields(&self) -> Vec<OutputField> {
        FormMutation::output_fields(self)
    }

    async fn run(&self, actor: Actor, input: FieldValues) -> MutationResult<MutationPayload> {
        self.execute(&actor, input).await
    }
}

fn input_object(mutation: &dyn SchemaMutation) -> InputObject {
    let object = mutation.input_fields().iter().fold(
        InputObject::new(mutation.input_type_name()),
        |object, field| {
            let type_ref = if field.required {
                TypeRef::named_nn(field.kind.scalar())
            } else {
                TypeRef::named(field.kind.scalar())
            };
            object.field(InputValue::new(field.graphql_name.as_str(), type_ref))
        },
    );
    object.field(InputValue::new(
        CLIENT_MUTATION_ID,
        TypeRef::named(TypeRef::STRING),
    ))
}

fn payload_object(mutation: &dyn SchemaMutation) -> Object {
    let mut object = Object::new(mutation.payload_type_name()).field(Field::new(
        "errors",
        TypeRef::named_nn_list_nn(ERROR_TYPE),
        |ctx| {
            FieldFuture::new(async move {
                let payload = ctx.parent_value.try_downcast_ref::<MutationPayload>()?;
                Ok(Some(FieldValue::list(
                    payload.errors.iter().cloned().map(FieldValue::owned_any),
                )))
            })
        },
    ));

    for output in mutation.output_fields() {
        let name = output.name.clone();
        object = object.field(Field::new(
            output.graphql_name.as_str(),
            TypeRef::named(output.type_name.as_str()),
            move |ctx| {
                let name = name.clone();
                FieldFuture::new(async move {
                    let payload = ctx.parent_value.try_downcast_ref::<MutationPayload>()?;
                    match payload.output(&name) {
                        Some(OutputValue::Record(record)) => {
                            Ok(Some(FieldValue::owned_any(record.clone())))
                        }
                        Some(OutputValue::Value(value)) if !value.is_null() => {
                            Ok(Some(FieldValue::value(GqlValue::from_json(value.clone())?)))
                        }
                        _ => Ok(None),
                    }
                })
            },
        ));
    }

    object.field(Field::new(
        CLIENT_MUTATION_ID,
        TypeRef::named(TypeRef::STRING),
        |ctx| {
            FieldFuture::new(async move {
                let payload = ctx.parent_value.try_downcast_ref::<MutationPayload>()?;
                Ok(payload
                    .client_mutation_id
                    .clone()
                    .map(FieldValue::value))
            })
        },
    ))
}

/// Split the `input` argument into field values and the client mutation id.
fn read_input(
    ctx: &ResolverContext<'_>,
    fields: &[InputField],
) -> Result<(FieldValues, Option<String>), Error> {
    let input = ctx.args.try_get("input")?.object()?;
    let mut values = FieldValues::new();
    let mut client_mutation_id = None;

    for (key, accessor) in input.iter() {
        let value = accessor.as_value().clone();
        if key.as_str() == CLIENT_MUTATION_ID {
            if let GqlValue::String(id) = value {
                client_mutation_id = Some(id);
            }
            continue;
        }
        let Some(field) = fields.iter().find(|f| f.graphql_name == key.as_str()) else {
            return Err(MutationError::InvalidInput(format!("unknown field '{}'", key))
                .to_graphql_error());
        };
        values.insert(field.name.clone(), value.into_json()?);
    }
    Ok((values, client_mutation_id))
}

fn mutation_field(mutation: Arc<dyn SchemaMutation>) -> Field {
    let input_type = mutation.input_type_name();
    Field::new(
        mutation.field_name(),
        TypeRef::named_nn(mutation.payload_type_name()),
        move |ctx| {
            let mutation = Arc::clone(&mutation);
            FieldFuture::new(async move {
                let (input, client_mutation_id) = read_input(&ctx, mutation.input_fields())?;
                let actor = ctx.data_opt::<Actor>().cloned().unwrap_or_default();

                let mut payload = mutation
                    .run(actor, input)
                    .await
                    .map_err(|e| e.to_graphql_error())?;
                payload.client_mutation_id = client_mutation_id;
                Ok(Some(FieldValue::owned_any(payload)))
            })
        },
    )
    .argument(InputValue::new("input", TypeRef::named_nn(input_type)))
}

/// Register the input and payload types of `mutation` on `builder`.
pub fn register_mutation(builder: SchemaBuilder, mutation: &dyn SchemaMutation) -> SchemaBuilder {
    builder
        .register(input_object(mutation))
        .register(payload_object(mutation))
}

/// Assemble a schema from the registry's types and the given mutations.
///
/// The query root is generated by [`Registry::query_root`].
pub fn build_schema(
    registry: &Registry,
    mutations: &[Arc<dyn SchemaMutation>],
) -> Result<Schema, SchemaError> {
    let mut builder = Schema::build(QUERY_ROOT, Some(MUTATION_ROOT), None);
    builder = registry.register_types(builder);
    builder = builder.register(registry.query_root(QUERY_ROOT));

    let mut root = Object::new(MUTATION_ROOT);
    for mutation in mutations {
        builder = register_mutation(builder, mutation.as_ref());
        root = root.field(mutation_field(Arc::clone(mutation)));
    }
    builder.register(root).finish()
}
