//! sea-orm adapter tests
//!
//! Model mutations persisting to a temporary SQLite database
#![cfg(feature = "database")]

use std::sync::Arc;

use anyhow::Result;
use model_mutation::auth::Actor;
use model_mutation::model::{FieldKind, FieldValues, Model, Record, SeaOrmModel};
use model_mutation::mutation::ModelMutation;
use model_mutation::registry::{ModelType, Registry};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityTrait, Schema};
use serde_json::{json, Value};
use tempfile::NamedTempFile;

mod books {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "books")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub title: String,
        pub author: Option<String>,
        pub pages: Option<i32>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Create a test database with the books table
async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    let stmt = Schema::new(DbBackend::Sqlite).create_table_from_entity(books::Entity);
    db.execute(db.get_database_backend().build(&stmt)).await?;

    Ok((db, temp_file))
}

fn input(value: Value) -> FieldValues {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => FieldValues::new(),
    }
}

#[tokio::test]
async fn test_fields_follow_columns() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let model = SeaOrmModel::<books::ActiveModel>::new("Book", db);

    let fields: Vec<_> = model
        .fields()
        .iter()
        .map(|field| (field.name.as_str(), field.kind, field.required, field.primary_key))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("id", FieldKind::Id, false, true),
            ("title", FieldKind::String, true, false),
            ("author", FieldKind::String, false, false),
            ("pages", FieldKind::Int, false, false),
        ]
    );
    assert_eq!(model.primary_key(), "id");

    Ok(())
}

#[tokio::test]
async fn test_store_crud() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let model = SeaOrmModel::<books::ActiveModel>::new("Book", db.clone());

    let created = model
        .save(Record::new(input(json!({"title": "Dune", "pages": 412}))))
        .await?;
    assert_eq!(created.get("id"), Some(&json!(1)));
    assert_eq!(created.get("author"), Some(&Value::Null));

    let mut changed = created.clone();
    changed.set("author", json!("Herbert"));
    let updated = model.save(changed).await?;
    assert_eq!(updated.get("title"), Some(&json!("Dune")));
    assert_eq!(updated.get("author"), Some(&json!("Herbert")));

    let row = books::Entity::find_by_id(1).one(&db).await?.expect("row");
    assert_eq!(row.author.as_deref(), Some("Herbert"));
    assert_eq!(row.pages, Some(412));

    // GraphQL IDs arrive as strings
    assert!(model.get(&json!("1")).await?.is_some());
    assert!(model.get(&json!("nope")).await?.is_none());

    model.delete(&updated).await?;
    assert!(books::Entity::find_by_id(1).one(&db).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_update_of_missing_row_fails() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let model = SeaOrmModel::<books::ActiveModel>::new("Book", db);

    let result = model
        .save(Record::new(input(json!({"id": 5, "title": "Ghost"}))))
        .await;
    assert!(result.is_err());

    Ok(())
}

#[tokio::test]
async fn test_model_mutation_over_database() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let model: Arc<dyn Model> = Arc::new(SeaOrmModel::<books::ActiveModel>::new("Book", db.clone()));
    let mut registry = Registry::new();
    registry.register(ModelType::new(Arc::clone(&model)));

    let save = ModelMutation::builder("SaveBook")
        .model(Arc::clone(&model))
        .build(&registry)?;
    let delete = ModelMutation::builder("DeleteBook")
        .model(Arc::clone(&model))
        .deleting(true)
        .build(&registry)?;
    let actor = Actor::anonymous();

    let payload = save
        .execute(&actor, input(json!({"title": "Old", "author": "A"})))
        .await?;
    assert!(payload.errors.is_empty());

    let payload = save
        .execute(&actor, input(json!({"id": "1", "title": "New"})))
        .await?;
    let book = payload.record("book").expect("book output");
    assert_eq!(book.get("title"), Some(&json!("New")));
    assert_eq!(book.get("author"), Some(&json!("A")));

    let payload = save
        .execute(&actor, input(json!({"title": "", "pages": "lots"})))
        .await?;
    assert_eq!(payload.errors.len(), 2);
    assert_eq!(books::Entity::find().all(&db).await?.len(), 1);

    let payload = delete.execute(&actor, input(json!({"id": 1}))).await?;
    assert_eq!(
        payload.record("book").and_then(|book| book.get("title")),
        Some(&json!("New"))
    );
    assert!(books::Entity::find().all(&db).await?.is_empty());

    let payload = delete.execute(&actor, input(json!({"id": 1}))).await?;
    assert_eq!(payload.errors[0].messages, vec!["Not found.".to_string()]);

    Ok(())
}
