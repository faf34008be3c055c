//! Reference readers and prefetch query cost.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use relman::prelude::*;

#[tokio::test]
async fn test_prefetched_reverse_costs_one_query() {
    let (db, executor) = counting_database(Settings::default()).await;
    let (work, home) = seed(&db).await;
    let relation = categories_todos_refs();

    let before = executor.selects();
    let rows = categories_manager(&db)
        .order_by(|c| c.id().asc())
        .get_with_references(&[&relation])
        .await
        .unwrap();
    assert_eq!(executor.selects(), before + 2);

    let mut per_category = Vec::new();
    for (category, reader) in &rows {
        let todos = reader.reverse(&relation).get().await.unwrap();
        per_category.push((category.id, todos.len()));
    }
    assert_eq!(per_category, vec![(work, 2), (home, 0)]);
    assert_eq!(executor.selects(), before + 2);
}

#[tokio::test]
async fn test_reverse_without_prefetch_queries_per_row() {
    let (db, executor) = counting_database(Settings::default()).await;
    seed(&db).await;
    let relation = categories_todos_refs();

    let before = executor.selects();
    let rows = categories_manager(&db).get_with_references(&[]).await.unwrap();
    for (_, reader) in &rows {
        reader.reverse(&relation).get().await.unwrap();
    }
    assert_eq!(executor.selects(), before + 1 + rows.len());
}

#[tokio::test]
async fn test_prefetched_forward() {
    let (db, executor) = counting_database(Settings::default()).await;
    seed(&db).await;
    let relation = todos_category();

    let before = executor.selects();
    let rows = todos_manager(&db)
        .order_by(|t| t.title().asc())
        .get_with_references(&[&relation])
        .await
        .unwrap();

    let mut categories = Vec::new();
    for (_, reader) in &rows {
        let category = reader.forward(&relation).await.unwrap();
        categories.push(category.map(|c| c.name));
    }
    assert_eq!(
        categories,
        vec![None, Some("work".to_string()), Some("work".to_string())]
    );
    assert_eq!(executor.selects(), before + 2);
}

#[tokio::test]
async fn test_prefetch_chunks_keys() {
    let mut settings = Settings::default();
    settings.prefetch.chunk_size = 1;
    let (db, executor) = counting_database(settings).await;
    seed(&db).await;

    let before = executor.selects();
    categories_manager(&db)
        .get_with_references(&[&categories_todos_refs()])
        .await
        .unwrap();
    // One base query plus one per category key
    assert_eq!(executor.selects(), before + 3);
}

#[tokio::test]
async fn test_references_for_row_read_elsewhere() {
    let db = database().await;
    seed(&db).await;

    let todos = todos_manager(&db);
    let report = todos
        .filter(|t| t.title().equals("write report"))
        .get_single()
        .await
        .unwrap();

    let reader = todos.references(report);
    let category = reader.forward(&todos_category()).await.unwrap().unwrap();
    assert_eq!(category.name, "work");

    let siblings = categories_manager(&db)
        .references(category)
        .reverse(&categories_todos_refs())
        .filter(|t| t.priority().less_than(3));
    let siblings = siblings.get().await.unwrap();
    assert_eq!(siblings.len(), 1);
    assert_eq!(siblings[0].title, "review 50% of PRs");
}

#[test]
fn test_relation_accessors_come_from_catalog() {
    let forward = todos_category();
    assert_eq!(forward.name(), "category");
    assert_eq!(forward.local_column(), "category");
    assert_eq!(forward.remote_column(), "id");

    let reverse = categories_todos_refs();
    assert_eq!(reverse.name(), "todos_refs");
    assert_eq!(reverse.local_column(), "id");
    assert_eq!(reverse.remote_column(), "category");
}
