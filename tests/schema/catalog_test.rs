//! Catalog validation and relation accessor derivation.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use relman::manager::Relation;
use relman::schema::{
    CatalogError, ColumnSchema, RelationKind, SchemaCatalog, SqlType, TableSchema,
};

fn users() -> TableSchema {
    TableSchema::new("users")
        .column(ColumnSchema::new("id", SqlType::Integer).not_null())
        .column(ColumnSchema::new("name", SqlType::Text).not_null())
        .primary_key(["id"])
}

#[test]
fn test_fixture_catalog_relations() {
    assert!(CATALOG.diagnostics().is_empty());
    assert_eq!(CATALOG.relations().len(), 2);

    let forward = CATALOG.relation("todos", "category").unwrap();
    assert_eq!(forward.kind, RelationKind::Forward);
    assert_eq!(forward.local_column, "category");
    assert_eq!(forward.remote_table, "categories");
    assert_eq!(forward.remote_column, "id");

    let reverse = CATALOG.relation("categories", "todos_refs").unwrap();
    assert_eq!(reverse.kind, RelationKind::Reverse);
    assert_eq!(reverse.local_column, "id");
    assert_eq!(reverse.remote_table, "todos");
    assert_eq!(reverse.remote_column, "category");

    let todos = CATALOG.table("todos").unwrap();
    let content = todos.find_column("content").unwrap();
    assert_eq!(content.replace_default(), relman::Value::Text(String::new()));
    assert_eq!(
        todos.find_column("category").unwrap().replace_default(),
        relman::Value::Null
    );
}

#[test]
fn test_forward_accessor_strips_id_suffix() {
    let catalog = SchemaCatalog::new(vec![
        users(),
        TableSchema::new("posts")
            .column(ColumnSchema::new("id", SqlType::Integer).not_null())
            .column(ColumnSchema::new("owner_id", SqlType::Integer))
            .primary_key(["id"])
            .foreign_key("owner_id", "users", "id"),
    ])
    .unwrap();

    assert!(catalog.relation("posts", "owner").is_ok());
    assert!(catalog.relation("users", "posts_refs").is_ok());
    assert!(matches!(
        catalog.relation("posts", "owner_id"),
        Err(CatalogError::UnknownRelation { .. })
    ));
}

#[test]
fn test_duplicate_reverse_accessors_are_dropped() {
    let catalog = SchemaCatalog::new(vec![
        users(),
        TableSchema::new("messages")
            .column(ColumnSchema::new("id", SqlType::Integer).not_null())
            .column(ColumnSchema::new("sender_id", SqlType::Integer))
            .column(ColumnSchema::new("recipient_id", SqlType::Integer))
            .primary_key(["id"])
            .foreign_key("sender_id", "users", "id")
            .foreign_key("recipient_id", "users", "id"),
    ])
    .unwrap();

    // Both forward accessors survive
    assert!(catalog.relation("messages", "sender").is_ok());
    assert!(catalog.relation("messages", "recipient").is_ok());

    // Both foreign keys would produce users.messages_refs
    assert!(catalog.relation("users", "messages_refs").is_err());
    let dropped: Vec<_> = catalog
        .diagnostics()
        .iter()
        .filter(|d| d.table == "users" && d.accessor == "messages_refs")
        .collect();
    assert_eq!(dropped.len(), 2);
}

#[test]
fn test_accessor_shadowing_a_column_is_dropped() {
    let catalog = SchemaCatalog::new(vec![
        users(),
        TableSchema::new("posts")
            .column(ColumnSchema::new("id", SqlType::Integer).not_null())
            .column(ColumnSchema::new("author", SqlType::Text))
            .column(ColumnSchema::new("author_id", SqlType::Integer))
            .primary_key(["id"])
            .foreign_key("author_id", "users", "id"),
    ])
    .unwrap();

    assert!(catalog.relation("posts", "author").is_err());
    assert_eq!(catalog.diagnostics().len(), 1);
    let diagnostic = &catalog.diagnostics()[0];
    assert_eq!(diagnostic.table, "posts");
    assert_eq!(diagnostic.accessor, "author");
    assert!(diagnostic.to_string().starts_with("posts.author:"));

    // The reverse side is unaffected
    assert!(catalog.relation("users", "posts_refs").is_ok());
}

#[test]
fn test_validation_errors() {
    let duplicate = SchemaCatalog::new(vec![users(), users()]);
    assert!(matches!(duplicate, Err(CatalogError::DuplicateTable(ref t)) if t == "users"));

    let bad_key = SchemaCatalog::new(vec![users().primary_key(["missing"])]);
    assert!(matches!(
        bad_key,
        Err(CatalogError::UnknownPrimaryKeyColumn { .. })
    ));

    let bad_fk_column = SchemaCatalog::new(vec![users().foreign_key("nope", "users", "id")]);
    assert!(matches!(
        bad_fk_column,
        Err(CatalogError::UnknownForeignKeyColumn { .. })
    ));

    let unresolved = SchemaCatalog::new(vec![
        users(),
        TableSchema::new("posts")
            .column(ColumnSchema::new("id", SqlType::Integer))
            .column(ColumnSchema::new("owner_id", SqlType::Integer))
            .foreign_key("owner_id", "accounts", "id"),
    ]);
    assert!(matches!(
        unresolved,
        Err(CatalogError::UnresolvedForeignKey { ref references, .. }) if references == "accounts.id"
    ));

    assert!(matches!(
        SchemaCatalog::from_json("{\"tables\": 3}"),
        Err(CatalogError::Json(_))
    ));
}

#[test]
fn test_relation_binding_checks_tables() {
    let info = CATALOG.relation("todos", "category").unwrap();
    let mismatched = Relation::from_info(info, Categories::new(), Todos::new());
    assert!(matches!(
        mismatched,
        Err(CatalogError::TableMismatch { ref expected, ref found, .. })
            if expected == "todos" && found == "categories"
    ));
}
