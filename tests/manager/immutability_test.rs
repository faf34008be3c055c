//! Builder calls return new managers and never touch the receiver.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use relman::sql::Dialect;

#[tokio::test]
async fn test_builders_leave_receiver_unchanged() {
    let db = database().await;
    let root = todos_manager(&db);
    let before = root.select_statement().to_sql(Dialect::Sqlite);

    let _ = root.filter(|t| t.done().equals(true));
    let _ = root.order_by(|t| t.priority().desc());
    let _ = root.limit(10, Some(5));
    let _ = root.filter(|t| t.category().name().equals("work"));
    let _ = root.having(|t| t.category().id().count().greater_than(0));

    assert_eq!(root.select_statement().to_sql(Dialect::Sqlite), before);
    assert!(root.state().filter().is_none());
    assert!(root.state().joins().is_empty());
    assert!(root.state().orderings().is_empty());
    assert!(root.state().group_by().is_empty());
    assert_eq!(root.state().limit(), None);
}

#[tokio::test]
async fn test_branches_from_shared_prefix_are_independent() {
    let db = database().await;
    seed(&db).await;

    let open = todos_manager(&db).filter(|t| t.done().equals(false));
    let urgent = open.filter(|t| t.priority().greater_than(2));
    let in_work = open.filter(|t| t.category().name().equals("work"));

    assert!(open.state().joins().is_empty());
    assert!(urgent.state().joins().is_empty());
    assert_eq!(in_work.state().joins().len(), 1);

    assert_eq!(open.count().await.unwrap(), 3);
    assert_eq!(urgent.count().await.unwrap(), 1);
    assert_eq!(in_work.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_limit_replaces_previous_limit() {
    let db = database().await;
    let first = todos_manager(&db).limit(5, Some(10));
    let second = first.limit(2, None);

    assert_eq!(first.state().limit(), Some(5));
    assert_eq!(first.state().offset(), Some(10));
    assert_eq!(second.state().limit(), Some(2));
    assert_eq!(second.state().offset(), None);
}
