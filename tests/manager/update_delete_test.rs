//! Updates and deletes, including filters that need joins.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use relman::sql::{Dialect, Statement};
use relman::ManagerError;

#[tokio::test]
async fn test_update_through_join_touches_only_matching_rows() {
    let db = database().await;
    seed(&db).await;

    let scoped = todos_manager(&db).filter(|t| t.category().name().equals("work"));
    let sql = Statement::from(scoped.update_statement(&TodoCompanion::default().done(true)))
        .to_sql(Dialect::Sqlite);
    assert!(sql.starts_with(r#"UPDATE "todos" SET "done" = true WHERE "id" IN ("#), "{sql}");
    assert_eq!(sql.matches("LEFT OUTER JOIN").count(), 1, "{sql}");

    let affected = scoped.update(|c| c.done(true)).await.unwrap();
    assert_eq!(affected, 2);

    let done: Vec<_> = todos_manager(&db)
        .filter(|t| t.done().equals(true))
        .order_by(|t| t.title().asc())
        .get()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(done, vec!["review 50% of PRs", "write report"]);
}

#[tokio::test]
async fn test_update_without_fields_is_rejected() {
    let db = database().await;
    seed(&db).await;

    let err = todos_manager(&db).update(|c| c).await.unwrap_err();
    assert!(matches!(err, ManagerError::EmptyCompanion { .. }));
}

#[tokio::test]
async fn test_update_all_rows() {
    let db = database().await;
    seed(&db).await;

    let affected = todos_manager(&db).update(|c| c.priority(9)).await.unwrap();
    assert_eq!(affected, 3);
}

#[tokio::test]
async fn test_delete_with_limit_uses_key_subquery() {
    let db = database().await;
    seed(&db).await;

    let first_two = todos_manager(&db).order_by(|t| t.id().asc()).limit(2, None);
    let sql = first_two.delete_statement().to_sql(Dialect::Sqlite);
    assert!(sql.starts_with(r#"DELETE FROM "todos" WHERE "id" IN ("#), "{sql}");

    assert_eq!(first_two.delete().await.unwrap(), 2);
    let left = todos_manager(&db).get_single().await.unwrap();
    assert_eq!(left.title, "buy milk");
}

#[tokio::test]
async fn test_delete_through_reverse_relation() {
    let db = database().await;
    let (_, home) = seed(&db).await;

    // Categories with no todos
    let affected = categories_manager(&db)
        .having(|c| c.todos_refs(|t| t.id().count()).equals(0))
        .delete()
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let remaining = categories_manager(&db).get().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_ne!(remaining[0].id, home);
}

#[tokio::test]
async fn test_plain_delete() {
    let db = database().await;
    seed(&db).await;

    let affected = todos_manager(&db)
        .filter(|t| t.category().id().is_null())
        .delete()
        .await
        .unwrap();
    assert_eq!(affected, 1);
    assert_eq!(todos_manager(&db).count().await.unwrap(), 2);

    assert_eq!(todos_manager(&db).delete().await.unwrap(), 2);
    assert!(!todos_manager(&db).exists().await.unwrap());
}
