//! Joins implied by filters and orderings are merged by column pair.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use relman::sql::Dialect;

fn join_count(sql: &str) -> usize {
    sql.matches("LEFT OUTER JOIN").count()
}

#[tokio::test]
async fn test_filter_and_order_through_same_relation_join_once() {
    let db = database().await;
    let manager = todos_manager(&db)
        .filter(|t| t.category().name().equals("work"))
        .order_by(|t| t.category().name().asc());

    assert_eq!(manager.state().joins().len(), 1);
    let sql = manager.select_statement().to_sql(Dialect::Sqlite);
    assert_eq!(join_count(&sql), 1, "{sql}");
}

#[tokio::test]
async fn test_repeated_filters_join_once() {
    let db = database().await;
    let manager = todos_manager(&db)
        .filter(|t| t.category().name().equals("work") | t.category().color().equals(3))
        .filter(|t| t.category().description().is_null());

    assert_eq!(manager.state().joins().len(), 1);
    let sql = manager.select_statement().to_sql(Dialect::Sqlite);
    assert_eq!(join_count(&sql), 1, "{sql}");
}

#[tokio::test]
async fn test_joined_filter_returns_matching_base_rows() {
    let db = database().await;
    seed(&db).await;

    let rows = todos_manager(&db)
        .filter(|t| t.category().name().equals("work"))
        .order_by(|t| t.title().asc())
        .get()
        .await
        .unwrap();

    let titles: Vec<_> = rows.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["review 50% of PRs", "write report"]);
}

#[tokio::test]
async fn test_reverse_filter_returns_each_base_row_once() {
    let db = database().await;
    let (work, _) = seed(&db).await;

    // Two todos match, but the category appears once
    let rows = categories_manager(&db)
        .filter(|c| c.todos_refs(|t| t.title().contains("e")))
        .get()
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, work);
}

#[tokio::test]
async fn test_ordering_by_relation_keeps_rows_without_match() {
    let db = database().await;
    seed(&db).await;

    let rows = todos_manager(&db)
        .order_by(|t| t.category().name().asc() & t.title().asc())
        .get()
        .await
        .unwrap();

    // Outer join keeps the uncategorised todo; NULL sorts first in SQLite
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].title, "buy milk");
}
