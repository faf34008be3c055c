//! Watch streams re-emit after writes to any table the query reads.

#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use common::*;
use futures::StreamExt;
use tokio::time::timeout;

const QUIET: Duration = Duration::from_millis(100);

#[tokio::test]
async fn test_watch_emits_current_rows_then_changes() {
    let db = database().await;
    let todos = todos_manager(&db);
    let mut stream = todos.filter(|t| t.done().equals(false)).watch();

    assert!(stream.next().await.unwrap().unwrap().is_empty());

    todos.create(|t| t.title("first")).await.unwrap();
    let rows = stream.next().await.unwrap().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "first");

    todos.update(|c| c.done(true)).await.unwrap();
    assert!(stream.next().await.unwrap().unwrap().is_empty());
}

#[tokio::test]
async fn test_write_to_joined_table_reemits() {
    let db = database().await;
    let (work, _) = seed(&db).await;

    let mut stream = todos_manager(&db)
        .filter(|t| t.category().name().equals("office"))
        .watch();
    assert!(stream.next().await.unwrap().unwrap().is_empty());

    categories_manager(&db)
        .filter(|c| c.id().equals(work))
        .update(|c| c.name("office"))
        .await
        .unwrap();
    let rows = stream.next().await.unwrap().unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_unrelated_write_does_not_reemit() {
    let db = database().await;
    seed(&db).await;

    let mut stream = categories_manager(&db).watch();
    assert_eq!(stream.next().await.unwrap().unwrap().len(), 2);

    todos_manager(&db).create(|t| t.title("unrelated")).await.unwrap();
    assert!(timeout(QUIET, stream.next()).await.is_err());
}

#[tokio::test]
async fn test_count_of_watched_rows_follows_deletes() {
    let db = database().await;
    seed(&db).await;

    let mut stream = todos_manager(&db).watch();
    assert_eq!(stream.next().await.unwrap().unwrap().len(), 3);

    todos_manager(&db)
        .filter(|t| t.title().equals("buy milk"))
        .delete()
        .await
        .unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap().len(), 2);
}

#[tokio::test]
async fn test_prefetched_manager_watch_emits_once() {
    let db = database().await;
    seed(&db).await;
    let relation = categories_todos_refs();

    let rows = categories_manager(&db)
        .filter(|c| c.name().equals("work"))
        .get_with_references(&[&relation])
        .await
        .unwrap();
    let mut stream = rows[0].1.reverse(&relation).watch();

    assert_eq!(stream.next().await.unwrap().unwrap().len(), 2);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_watch_ends_when_database_dropped() {
    let db = database().await;
    seed(&db).await;

    let mut stream = todos_manager(&db).watch();
    assert_eq!(stream.next().await.unwrap().unwrap().len(), 3);

    drop(db);
    let next = timeout(Duration::from_secs(5), stream.next()).await;
    assert!(matches!(next, Ok(None)));
}

#[tokio::test]
async fn test_watch_single_ends_when_database_dropped() {
    let db = database().await;
    let (work, _) = seed(&db).await;

    let mut stream = categories_manager(&db)
        .filter(|c| c.id().equals(work))
        .watch_single();
    assert_eq!(stream.next().await.unwrap().unwrap().name, "work");

    drop(db);
    assert!(timeout(Duration::from_secs(5), stream.next()).await.unwrap().is_none());
}
