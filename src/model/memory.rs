use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Model, ModelField, Record};
use crate::errors::{StoreError, StoreResult};

/// In-memory model store with auto-increment integer primary keys
#[derive(Debug)]
pub struct MemoryModel {
    name: String,
    fields: Vec<ModelField>,
    rows: RwLock<IndexMap<i64, Record>>,
    next_id: AtomicI64,
}

impl MemoryModel {
    /// Without a field flagged as primary key, `id` becomes the auto key.
    pub fn new(name: impl Into<String>, mut fields: Vec<ModelField>) -> Self {
        if !fields.iter().any(|field| field.primary_key) {
            match fields.iter_mut().find(|field| field.name == "id") {
                Some(id) => id.primary_key = true,
                None => fields.insert(0, ModelField::auto_id()),
            }
        }
        Self {
            name: name.into(),
            fields,
            rows: RwLock::new(IndexMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub async fn all(&self) -> Vec<Record> {
        self.rows.read().await.values().cloned().collect()
    }

    /// Ids arrive as numbers or, from GraphQL `ID` inputs, as strings.
    fn parse_pk(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[async_trait]
impl Model for MemoryModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[ModelField] {
        &self.fields
    }

    async fn get(&self, pk: &Value) -> StoreResult<Option<Record>> {
        let Some(id) = Self::parse_pk(pk) else {
            return Ok(None);
        };
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, mut record: Record) -> StoreResult<Record> {
        let pk_name = self.primary_key().to_string();
        let mut rows = self.rows.write().await;

        let id = match record.get(&pk_name).and_then(Self::parse_pk) {
            Some(id) => {
                if !rows.contains_key(&id) {
                    return Err(StoreError::Missing {
                        model: self.name.clone(),
                        pk: id.to_string(),
                    });
                }
                id
            }
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        };

        // Keep the stored row shaped like the model: pk first, every field present.
        let mut values = IndexMap::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = if field.name == pk_name {
                Value::from(id)
            } else {
                record.get(&field.name).cloned().unwrap_or(Value::Null)
            };
            values.insert(field.name.clone(), value);
        }
        record = Record::new(values);

        debug!("Saved {} {}", self.name, id);
        rows.insert(id, record.clone());
        Ok(record)
    }

    async fn delete(&self, record: &Record) -> StoreResult<()> {
        let pk = record.get(self.primary_key()).cloned().unwrap_or(Value::Null);
        let Some(id) = Self::parse_pk(&pk) else {
            return Err(StoreError::Missing {
                model: self.name.clone(),
                pk: super::pk_to_string(&pk),
            });
        };

        let removed = self.rows.write().await.shift_remove(&id);
        if removed.is_none() {
            return Err(StoreError::Missing {
                model: self.name.clone(),
                pk: id.to_string(),
            });
        }
        debug!("Deleted {} {}", self.name, id);
        Ok(())
    }
}
