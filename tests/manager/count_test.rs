//! Count and exists agree with `get` regardless of statement shape.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use relman::sql::Dialect;

#[tokio::test]
async fn test_count_plain_table() {
    let db = database().await;
    assert_eq!(todos_manager(&db).count().await.unwrap(), 0);

    seed(&db).await;
    assert_eq!(todos_manager(&db).count().await.unwrap(), 3);
    assert_eq!(categories_manager(&db).count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_count_under_join_fan_out() {
    let db = database().await;
    seed(&db).await;

    // Both work todos match; the category must still count once
    let manager = categories_manager(&db).filter(|c| c.todos_refs(|t| t.title().is_not_null()));
    assert_eq!(manager.count().await.unwrap(), 1);
    assert_eq!(manager.get().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_count_respects_pagination() {
    let db = database().await;
    seed(&db).await;

    let page = todos_manager(&db).order_by(|t| t.id().asc()).limit(2, Some(0));
    assert_eq!(page.count().await.unwrap(), 2);

    let tail = todos_manager(&db).order_by(|t| t.id().asc()).limit(10, Some(2));
    assert_eq!(tail.count().await.unwrap(), 1);

    let sql = page.count_statement().to_sql(Dialect::Sqlite);
    assert!(sql.contains(r#"AS "q""#), "{sql}");
}

#[tokio::test]
async fn test_exists() {
    let db = database().await;
    assert!(!todos_manager(&db).exists().await.unwrap());

    seed(&db).await;
    assert!(todos_manager(&db).exists().await.unwrap());
    assert!(todos_manager(&db)
        .filter(|t| t.category().name().equals("work"))
        .exists()
        .await
        .unwrap());
    assert!(!todos_manager(&db)
        .filter(|t| t.category().name().equals("home"))
        .exists()
        .await
        .unwrap());
}

#[tokio::test]
async fn test_count_matches_get_for_every_shape() {
    let db = database().await;
    seed(&db).await;

    let shapes = vec![
        todos_manager(&db).filter(|t| t.done().equals(false)),
        todos_manager(&db).filter(|t| t.category().name().starts_with("w")),
        todos_manager(&db).order_by(|t| t.category().name().desc()),
        todos_manager(&db).having(|t| t.category().id().count().equals(1)),
        todos_manager(&db).limit(1, Some(1)),
    ];

    for manager in shapes {
        let rows = manager.get().await.unwrap();
        assert_eq!(
            manager.count().await.unwrap(),
            rows.len() as u64,
            "{}",
            manager.select_statement().to_sql(Dialect::Sqlite)
        );
    }
}
