//! Forward and reverse reference resolution with optional prefetching.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::table::{Relation, Table};
use super::{ProcessedTableManager, RootTableManager};
use crate::error::ManagerResult;
use crate::executor::Database;
use crate::sql::{Expr, ExprExt};
use crate::value::{Value, ValueKey};

/// Related rows loaded ahead of time, keyed by relation name.
///
/// Each entry holds a `Vec<R::Row>` for the relation's remote table.
pub type PrefetchedRows = HashMap<String, Arc<dyn Any + Send + Sync>>;

/// A relation whose rows can be loaded for a batch of base rows at once.
#[async_trait]
pub trait Prefetch<T: Table>: Send + Sync {
    fn name(&self) -> &str;

    /// Load every related row of `rows`.
    async fn load(&self, db: &Database, rows: &[T::Row])
        -> ManagerResult<Arc<dyn Any + Send + Sync>>;
}

#[async_trait]
impl<T: Table, R: Table> Prefetch<T> for Relation<T, R> {
    fn name(&self) -> &str {
        Relation::name(self)
    }

    async fn load(
        &self,
        db: &Database,
        rows: &[T::Row],
    ) -> ManagerResult<Arc<dyn Any + Send + Sync>> {
        let mut seen: HashSet<ValueKey> = HashSet::new();
        let keys: Vec<Value> = rows
            .iter()
            .filter_map(|row| self.local().row_value(row, self.local_column()))
            .filter(|key| !key.is_null() && seen.insert(key.key()))
            .collect();

        let chunk_size = db.settings().prefetch.chunk_size.max(1);
        let remote = self.remote();
        let mut related: Vec<R::Row> = Vec::new();

        for chunk in keys.chunks(chunk_size) {
            let filter = remote
                .column_ref(self.remote_column())
                .expr()
                .in_list(chunk.iter().cloned().map(Expr::Value).collect());
            let loaded = RootTableManager::new(db.clone(), remote.clone())
                .with_filter(filter)
                .get()
                .await?;
            related.extend(loaded);
        }

        tracing::debug!(
            relation = %self.name(),
            keys = keys.len(),
            rows = related.len(),
            "prefetched related rows"
        );
        Ok(Arc::new(related))
    }
}

/// Reference accessors for one row.
#[derive(Clone)]
pub struct ReferenceReader<T: Table> {
    db: Database,
    table: T,
    row: T::Row,
    prefetched: Arc<PrefetchedRows>,
}

impl<T: Table> ReferenceReader<T> {
    pub fn new(db: Database, table: T, row: T::Row, prefetched: Arc<PrefetchedRows>) -> Self {
        Self {
            db,
            table,
            row,
            prefetched,
        }
    }

    pub fn row(&self) -> &T::Row {
        &self.row
    }

    pub fn into_row(self) -> T::Row {
        self.row
    }

    fn key(&self, relation_column: &str) -> Option<Value> {
        self.table
            .row_value(&self.row, relation_column)
            .filter(|v| !v.is_null())
    }

    fn cached<R: Table>(&self, relation: &Relation<T, R>) -> Option<Vec<R::Row>> {
        let key = self.key(relation.local_column())?;
        let rows = self
            .prefetched
            .get(relation.name())?
            .downcast_ref::<Vec<R::Row>>()?;
        Some(
            rows.iter()
                .filter(|row| {
                    relation
                        .remote()
                        .row_value(row, relation.remote_column())
                        .is_some_and(|v| v.same_key(&key))
                })
                .cloned()
                .collect(),
        )
    }

    /// The single row a forward relation points at. `None` when the foreign
    /// key is NULL or the referenced row does not exist.
    pub async fn forward<R: Table>(&self, relation: &Relation<T, R>) -> ManagerResult<Option<R::Row>> {
        let Some(key) = self.key(relation.local_column()) else {
            return Ok(None);
        };
        if let Some(rows) = self.cached(relation) {
            return Ok(rows.into_iter().next());
        }

        let remote = relation.remote();
        RootTableManager::new(self.db.clone(), remote.clone())
            .with_filter(remote.column_ref(relation.remote_column()).expr().eq(key))
            .get_single_or_null()
            .await
    }

    /// Rows of the remote table pointing at this row, as a filtered manager.
    ///
    /// When the relation was prefetched the manager is seeded with the
    /// matching rows and answers `get`/`watch` without a query until it is
    /// refined further.
    pub fn reverse<R: Table>(&self, relation: &Relation<T, R>) -> ProcessedTableManager<R> {
        let remote = relation.remote();
        let key = self.key(relation.local_column()).unwrap_or(Value::Null);
        let manager = RootTableManager::new(self.db.clone(), remote.clone())
            .with_filter(remote.column_ref(relation.remote_column()).expr().eq(key));

        match self.cached(relation) {
            Some(rows) => manager.with_prefetched(Arc::new(rows)),
            None => manager,
        }
    }
}

impl<T: Table> fmt::Debug for ReferenceReader<T>
where
    T::Row: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.prefetched.keys().collect();
        names.sort();
        f.debug_struct("ReferenceReader")
            .field("table", &self.table.actual_name())
            .field("row", &self.row)
            .field("prefetched", &names)
            .finish()
    }
}
