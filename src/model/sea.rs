//! [`Model`] adapter over a sea-orm entity
//!
//! Columns of the entity become model fields. Values are converted from JSON
//! to typed sea-orm values using each column's declared type; columns of
//! types this adapter cannot convert are left out of the field list and are
//! never written.

use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveModelBehavior, IdenStatic, IntoActiveModel, Iterable, PrimaryKeyToColumn, QueryFilter,
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::{pk_to_string, FieldKind, FieldValues, Model, ModelField, Record};
use crate::errors::{StoreError, StoreResult};

/// Model store backed by the table of a sea-orm active model
pub struct SeaOrmModel<A> {
    db: DatabaseConnection,
    name: String,
    fields: Vec<ModelField>,
    _active_model: PhantomData<fn() -> A>,
}

impl<A> SeaOrmModel<A>
where
    A: ActiveModelTrait,
{
    pub fn new(name: impl Into<String>, db: DatabaseConnection) -> Self {
        let pk_column = primary_key_column::<A::Entity>();

        let fields = <A::Entity as EntityTrait>::Column::iter()
            .filter_map(|column| {
                let def = column.def();
                let kind = kind_for(def.get_column_type())?;
                let primary_key = Some(column.as_str()) == pk_column.as_ref().map(|c| c.as_str());
                Some(ModelField {
                    name: column.as_str().to_string(),
                    kind: if primary_key { FieldKind::Id } else { kind },
                    required: !primary_key && !def.is_null(),
                    primary_key,
                    max_length: max_length_for(def.get_column_type()),
                    editable: true,
                })
            })
            .collect();

        Self {
            db,
            name: name.into(),
            fields,
            _active_model: PhantomData,
        }
    }

    fn column(&self, name: &str) -> Option<<A::Entity as EntityTrait>::Column> {
        <A::Entity as EntityTrait>::Column::iter().find(|column| column.as_str() == name)
    }
}

fn primary_key_column<E: EntityTrait>() -> Option<E::Column> {
    E::PrimaryKey::iter().next().map(|pk| pk.into_column())
}

fn kind_for(column_type: &ColumnType) -> Option<FieldKind> {
    match column_type {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger => Some(FieldKind::Int),
        ColumnType::Float | ColumnType::Double => Some(FieldKind::Float),
        ColumnType::Boolean => Some(FieldKind::Boolean),
        ColumnType::String(_) | ColumnType::Text | ColumnType::Char(_) => Some(FieldKind::String),
        _ => None,
    }
}

fn max_length_for(column_type: &ColumnType) -> Option<usize> {
    match column_type {
        ColumnType::String(Some(len)) | ColumnType::Char(Some(len)) => Some(*len as usize),
        _ => None,
    }
}

fn conversion_error(field: &str, expected: &str, value: &JsonValue) -> StoreError {
    StoreError::Conversion {
        field: field.to_string(),
        reason: format!("expected {}, got {}", expected, value),
    }
}

/// Convert a JSON value into the sea-orm value a column of this type stores.
fn to_db_value(field: &str, column_type: &ColumnType, value: &JsonValue) -> StoreResult<Value> {
    let null = value.is_null();
    let converted = match column_type {
        ColumnType::TinyInteger | ColumnType::SmallInteger | ColumnType::Integer => {
            if null {
                Value::Int(None)
            } else {
                let n = as_i64(value).ok_or_else(|| conversion_error(field, "integer", value))?;
                let n = i32::try_from(n).map_err(|_| conversion_error(field, "32-bit integer", value))?;
                Value::Int(Some(n))
            }
        }
        ColumnType::BigInteger => {
            if null {
                Value::BigInt(None)
            } else {
                Value::BigInt(Some(
                    as_i64(value).ok_or_else(|| conversion_error(field, "integer", value))?,
                ))
            }
        }
        ColumnType::Float | ColumnType::Double => {
            if null {
                Value::Double(None)
            } else {
                Value::Double(Some(
                    value
                        .as_f64()
                        .ok_or_else(|| conversion_error(field, "number", value))?,
                ))
            }
        }
        ColumnType::Boolean => {
            if null {
                Value::Bool(None)
            } else {
                Value::Bool(Some(
                    value
                        .as_bool()
                        .ok_or_else(|| conversion_error(field, "boolean", value))?,
                ))
            }
        }
        ColumnType::String(_) | ColumnType::Text | ColumnType::Char(_) => match value {
            JsonValue::Null => Value::String(None),
            JsonValue::String(s) => Value::String(Some(Box::new(s.clone()))),
            other => Value::String(Some(Box::new(other.to_string()))),
        },
        other => {
            return Err(StoreError::Conversion {
                field: field.to_string(),
                reason: format!("unsupported column type {:?}", other),
            })
        }
    };

    // Float columns hold f32 on the entity side.
    if matches!(column_type, ColumnType::Float) {
        if let Value::Double(v) = converted {
            return Ok(Value::Float(v.map(|v| v as f32)));
        }
    }
    Ok(converted)
}

fn as_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_record<M: Serialize>(model: &M) -> StoreResult<Record> {
    match serde_json::to_value(model)? {
        JsonValue::Object(map) => Ok(Record::new(map.into_iter().collect::<FieldValues>())),
        other => Err(StoreError::Conversion {
            field: String::new(),
            reason: format!("row serialized to non-object {}", other),
        }),
    }
}

#[async_trait]
impl<A> Model for SeaOrmModel<A>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + Sync + 'static,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A> + Serialize + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[ModelField] {
        &self.fields
    }

    async fn get(&self, pk: &JsonValue) -> StoreResult<Option<Record>> {
        let row = self.get_row(pk).await?;
        row.as_ref().map(|row| to_record(row)).transpose()
    }

    async fn save(&self, record: Record) -> StoreResult<Record> {
        let pk_name = self.primary_key().to_string();
        let existing = match record.get(&pk_name) {
            Some(pk) if !pk.is_null() => match self.get_row(pk).await? {
                Some(row) => Some(row),
                None => {
                    return Err(StoreError::Missing {
                        model: self.name.clone(),
                        pk: pk_to_string(pk),
                    })
                }
            },
            _ => None,
        };

        let is_update = existing.is_some();
        let mut active: A = match existing {
            Some(row) => row.into_active_model(),
            None => <A as ActiveModelTrait>::default(),
        };

        for field in self.fields.iter().filter(|field| field.is_editable()) {
            let Some(value) = record.get(&field.name) else {
                continue;
            };
            let Some(column) = self.column(&field.name) else {
                continue;
            };
            let value = to_db_value(&field.name, column.def().get_column_type(), value)?;
            active.set(column, value);
        }

        let saved = if is_update {
            active.update(&self.db).await?
        } else {
            active.insert(&self.db).await?
        };
        debug!(
            "{} {} row",
            if is_update { "Updated" } else { "Inserted" },
            self.name
        );
        to_record(&saved)
    }

    async fn delete(&self, record: &Record) -> StoreResult<()> {
        let pk_name = self.primary_key().to_string();
        let pk = record.get(&pk_name).cloned().unwrap_or(JsonValue::Null);
        let Some(row) = self.get_row(&pk).await? else {
            return Err(StoreError::Missing {
                model: self.name.clone(),
                pk: pk_to_string(&pk),
            });
        };

        let active: A = row.into_active_model();
        active.delete(&self.db).await?;
        debug!("Deleted {} row {}", self.name, pk_to_string(&pk));
        Ok(())
    }
}

impl<A> SeaOrmModel<A>
where
    A: ActiveModelTrait + Send + Sync,
{
    /// An id that cannot be a key of this table matches nothing.
    async fn get_row(
        &self,
        pk: &JsonValue,
    ) -> StoreResult<Option<<A::Entity as EntityTrait>::Model>> {
        let Some(column) = primary_key_column::<A::Entity>() else {
            return Ok(None);
        };
        let Ok(key) = to_db_value(column.as_str(), column.def().get_column_type(), pk) else {
            return Ok(None);
        };
        Ok(<A::Entity as EntityTrait>::find()
            .filter(column.eq(key))
            .one(&self.db)
            .await?)
    }
}
