//! Full-row replace versus partial update.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use relman::ManagerError;

async fn stored_todo(db: &relman::Database) -> (i64, Todo) {
    let (work, _) = seed(db).await;
    let todo = todos_manager(db)
        .filter(|t| t.title().equals("write report"))
        .get_single()
        .await
        .unwrap();
    assert_eq!(todo.category, Some(work));
    assert_eq!(todo.priority, Some(3));
    (work, todo)
}

#[tokio::test]
async fn test_replace_resets_unset_columns_to_defaults() {
    let db = database().await;
    let (_, todo) = stored_todo(&db).await;

    let replaced = todos_manager(&db)
        .replace(TodoCompanion::default().id(todo.id).title("rewritten"))
        .await
        .unwrap();
    assert!(replaced);

    let after = todos_manager(&db)
        .filter(|t| t.id().equals(todo.id))
        .get_single()
        .await
        .unwrap();
    assert_eq!(after.title, "rewritten");
    assert_eq!(after.content, "");
    assert_eq!(after.priority, Some(1));
    assert_eq!(after.category, None);
    assert!(!after.done);
}

#[tokio::test]
async fn test_update_keeps_unset_columns() {
    let db = database().await;
    let (work, todo) = stored_todo(&db).await;

    let affected = todos_manager(&db)
        .filter(|t| t.id().equals(todo.id))
        .update(|c| c.title("rewritten"))
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let after = todos_manager(&db)
        .filter(|t| t.id().equals(todo.id))
        .get_single()
        .await
        .unwrap();
    assert_eq!(after.title, "rewritten");
    assert_eq!(after.priority, Some(3));
    assert_eq!(after.category, Some(work));
}

#[tokio::test]
async fn test_replace_missing_row_reports_false() {
    let db = database().await;
    seed(&db).await;

    let replaced = todos_manager(&db)
        .replace(TodoCompanion::default().id(999).title("ghost"))
        .await
        .unwrap();
    assert!(!replaced);
    assert_eq!(todos_manager(&db).count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_replace_requires_primary_key() {
    let db = database().await;
    let err = todos_manager(&db)
        .replace(TodoCompanion::default().title("no id"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::MissingPrimaryKey { ref column, .. } if column == "id"
    ));
}

#[tokio::test]
async fn test_bulk_replace_counts_replaced_rows() {
    let db = database().await;
    seed(&db).await;
    let ids: Vec<i64> = todos_manager(&db)
        .order_by(|t| t.id().asc())
        .get()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();

    let replaced = todos_manager(&db)
        .bulk_replace(vec![
            TodoCompanion::default().id(ids[0]).title("a").done(true),
            TodoCompanion::default().id(ids[1]).title("b"),
            TodoCompanion::default().id(12345).title("missing"),
        ])
        .await
        .unwrap();
    assert_eq!(replaced, 2);

    let done = todos_manager(&db)
        .filter(|t| t.done().equals(true))
        .get_single()
        .await
        .unwrap();
    assert_eq!(done.title, "a");
}
