//! Table managers: the user-facing query and write API.
//!
//! One generic [`TableManager`] covers both faces of a table:
//!
//! - [`RootTableManager`] (`Insertable`): a fresh manager; can insert,
//!   replace, and everything below
//! - [`ProcessedTableManager`] (`Filtered`): reached through any builder call
//!   (`filter`, `order_by`, `having`, `limit`, `distinct`); reads, counts,
//!   updates and deletes, but never inserts
//!
//! Every builder call returns a new manager over a new state; the receiver
//! is never modified.

mod companion;
mod composer;
mod group_by;
mod join;
mod references;
mod state;
mod table;

#[cfg(test)]
pub(crate) mod test_tables;

pub use companion::{Companion, Field};
pub use composer::{
    combine_exprs, composable_builder, composer_builder, group_size, relation_composer,
    reverse_composer, Aggregate, AggregateFilter, ColumnFilters, ColumnOrderings, Composer,
    ComposerState, Filter, Ordering,
};
pub use group_by::{apply_group_by, GroupByBuilder, TempGroupByBuilder};
pub use join::{join_alias, JoinBuilder, JoinSet};
pub use references::{Prefetch, PrefetchedRows, ReferenceReader};
pub use state::{ResolvedSelect, TableManagerState, COUNT_COLUMN, EXISTS_COLUMN};
pub use table::{Column, ColumnRef, Relation, Table};

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::{ManagerError, ManagerResult};
use crate::executor::Database;
use crate::sql::{
    col, star, BinaryOperator, Expr, ExprExt, Insert, InsertMode, OnConflict, Select, Statement,
    Update,
};
use crate::value::{Row, Value};

// =============================================================================
// Capability markers
// =============================================================================

mod sealed {
    pub trait Sealed {}
}

/// Which operations a manager exposes.
pub trait ManagerMode: sealed::Sealed + Send + Sync + 'static {}

/// Root manager: inserts and replaces allowed.
#[derive(Debug, Clone, Copy)]
pub struct Insertable;

/// Refined manager: no inserts.
#[derive(Debug, Clone, Copy)]
pub struct Filtered;

impl sealed::Sealed for Insertable {}
impl sealed::Sealed for Filtered {}
impl ManagerMode for Insertable {}
impl ManagerMode for Filtered {}

// =============================================================================
// Manager
// =============================================================================

/// Query and write facade over one table.
pub struct TableManager<T: Table, M: ManagerMode = Insertable> {
    state: TableManagerState<T>,
    _mode: PhantomData<M>,
}

pub type RootTableManager<T> = TableManager<T, Insertable>;
pub type ProcessedTableManager<T> = TableManager<T, Filtered>;

/// Options for a single insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertOptions {
    /// Overrides `settings.insert.default_mode`.
    pub mode: Option<InsertMode>,
    pub on_conflict: Option<OnConflict>,
}

impl InsertOptions {
    pub fn mode(mode: InsertMode) -> Self {
        Self {
            mode: Some(mode),
            on_conflict: None,
        }
    }

    pub fn on_conflict(conflict: OnConflict) -> Self {
        Self {
            mode: None,
            on_conflict: Some(conflict),
        }
    }
}

impl<T: Table, M: ManagerMode> Clone for TableManager<T, M> {
    fn clone(&self) -> Self {
        Self::from_state(self.state.clone())
    }
}

impl<T: Table, M: ManagerMode> fmt::Debug for TableManager<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableManager")
            .field("mode", &std::any::type_name::<M>())
            .field("state", &self.state)
            .finish()
    }
}

impl<T: Table> TableManager<T, Insertable> {
    pub fn new(db: Database, table: T) -> Self {
        Self::from_state(TableManagerState::new(db, table))
    }
}

impl<T: Table, M: ManagerMode> TableManager<T, M> {
    fn from_state(state: TableManagerState<T>) -> Self {
        Self {
            state,
            _mode: PhantomData,
        }
    }

    fn refine(&self, edit: impl FnOnce(&mut TableManagerState<T>)) -> ProcessedTableManager<T> {
        TableManager::from_state(self.state.copy_with(edit))
    }

    pub fn state(&self) -> &TableManagerState<T> {
        &self.state
    }

    pub fn table(&self) -> &T {
        self.state.table()
    }

    pub fn db(&self) -> &Database {
        self.state.db()
    }

    fn table_name(&self) -> String {
        self.table().actual_name().to_string()
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    /// Add a predicate, ANDed with any existing one.
    pub fn filter(&self, f: impl FnOnce(T::Filters) -> Filter) -> ProcessedTableManager<T> {
        let filter = f(T::Filters::new(ComposerState::root(self.table().clone())));
        self.refine(|s| {
            s.filter = combine_exprs(s.filter.take(), filter.expr, BinaryOperator::And);
            s.joins.extend(&filter.joins);
        })
    }

    /// Append ordering terms after any existing ones.
    pub fn order_by(&self, f: impl FnOnce(T::Orderings) -> Ordering) -> ProcessedTableManager<T> {
        let ordering = f(T::Orderings::new(ComposerState::root(self.table().clone())));
        self.refine(|s| {
            s.orderings.extend(ordering.terms);
            s.joins.extend(&ordering.joins);
        })
    }

    /// Keep base rows whose group (one per primary key) satisfies an
    /// aggregate predicate.
    pub fn having(&self, f: impl FnOnce(T::Filters) -> AggregateFilter) -> ProcessedTableManager<T> {
        let aggregate = f(T::Filters::new(ComposerState::root(self.table().clone())));
        let key: Vec<Expr> = self
            .table()
            .primary_key()
            .iter()
            .map(|c| self.table().column_ref(c).expr())
            .collect();
        let entry = TempGroupByBuilder::new(key).with_having(aggregate.predicate);
        self.refine(|s| {
            if !s.group_by.contains(&entry) {
                s.group_by.push(entry);
            }
            s.joins.extend(&aggregate.joins);
        })
    }

    pub fn limit(&self, limit: u64, offset: Option<u64>) -> ProcessedTableManager<T> {
        self.refine(|s| {
            s.limit = Some(limit);
            s.offset = offset;
        })
    }

    /// Whether joined selects return each base row once (default on).
    pub fn distinct(&self, distinct: bool) -> ProcessedTableManager<T> {
        self.refine(|s| s.distinct = distinct)
    }

    pub(crate) fn with_filter(&self, expr: Expr) -> ProcessedTableManager<T> {
        self.refine(|s| {
            s.filter = Some(match s.filter.take() {
                Some(existing) => existing.and(expr),
                None => expr,
            });
        })
    }

    pub(crate) fn with_prefetched(&self, rows: Arc<Vec<T::Row>>) -> ProcessedTableManager<T> {
        let mut state = self.state.clone();
        state.prefetched = Some(rows);
        TableManager::from_state(state)
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    pub fn select_statement(&self) -> Select {
        self.state.build_select_statement(None).into_select()
    }

    pub fn count_statement(&self) -> Select {
        self.state.build_count_statement()
    }

    pub fn exists_statement(&self) -> Select {
        self.state.build_exists_statement()
    }

    pub fn update_statement(&self, companion: &T::Companion) -> Update {
        self.state.build_update_statement(companion.entries())
    }

    pub fn delete_statement(&self) -> Statement {
        self.state.build_delete_statement().into()
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    fn map_rows(table: &T, rows: &[Row]) -> ManagerResult<Vec<T::Row>> {
        rows.iter()
            .map(|row| table.map_row(row).map_err(ManagerError::from))
            .collect()
    }

    pub async fn get(&self) -> ManagerResult<Vec<T::Row>> {
        if let Some(rows) = self.state.prefetched() {
            return Ok(rows.as_ref().clone());
        }
        let rows = self.db().executor().get(&self.select_statement()).await?;
        Self::map_rows(self.table(), &rows)
    }

    /// Current rows, then fresh rows after every write to a table the query
    /// reads.
    pub fn watch(&self) -> BoxStream<'static, ManagerResult<Vec<T::Row>>> {
        if let Some(rows) = self.state.prefetched() {
            let rows = rows.as_ref().clone();
            return stream::once(future::ready(Ok(rows))).boxed();
        }
        let table = self.table().clone();
        self.db()
            .executor()
            .watch(self.select_statement())
            .map(move |result| Self::map_rows(&table, &result?))
            .boxed()
    }

    /// Exactly one row.
    pub async fn get_single(&self) -> ManagerResult<T::Row> {
        exactly_one(&self.table_name(), self.get().await?)
    }

    pub fn watch_single(&self) -> BoxStream<'static, ManagerResult<T::Row>> {
        let table = self.table_name();
        self.watch()
            .map(move |rows| exactly_one(&table, rows?))
            .boxed()
    }

    /// Zero or one row; more is an error.
    pub async fn get_single_or_null(&self) -> ManagerResult<Option<T::Row>> {
        at_most_one(&self.table_name(), self.get().await?)
    }

    pub fn watch_single_or_null(&self) -> BoxStream<'static, ManagerResult<Option<T::Row>>> {
        let table = self.table_name();
        self.watch()
            .map(move |rows| at_most_one(&table, rows?))
            .boxed()
    }

    pub async fn count(&self) -> ManagerResult<u64> {
        let rows = self.db().executor().get(&self.count_statement()).await?;
        let count = match rows.first() {
            Some(row) => row.get::<i64>(COUNT_COLUMN)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    pub async fn exists(&self) -> ManagerResult<bool> {
        let rows = self.db().executor().get(&self.exists_statement()).await?;
        match rows.first() {
            Some(row) => Ok(row.get::<bool>(EXISTS_COLUMN)?),
            None => Ok(false),
        }
    }

    /// Rows plus a [`ReferenceReader`] for each, with `prefetch` relations
    /// loaded up front (one query per relation and key chunk).
    pub async fn get_with_references(
        &self,
        prefetch: &[&dyn Prefetch<T>],
    ) -> ManagerResult<Vec<(T::Row, ReferenceReader<T>)>> {
        let rows = self.get().await?;

        let mut loaded: PrefetchedRows = HashMap::new();
        for relation in prefetch {
            let related = relation.load(self.db(), &rows).await?;
            loaded.insert(relation.name().to_string(), related);
        }
        let loaded = Arc::new(loaded);

        Ok(rows
            .into_iter()
            .map(|row| {
                let reader = ReferenceReader::new(
                    self.db().clone(),
                    self.table().clone(),
                    row.clone(),
                    Arc::clone(&loaded),
                );
                (row, reader)
            })
            .collect())
    }

    /// Reference accessors for a row read elsewhere.
    pub fn references(&self, row: T::Row) -> ReferenceReader<T> {
        ReferenceReader::new(
            self.db().clone(),
            self.table().clone(),
            row,
            Arc::new(HashMap::new()),
        )
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Write the set fields of the companion to every matching row; unset
    /// fields keep their stored values. Returns the affected row count.
    pub async fn update(
        &self,
        f: impl FnOnce(T::Companion) -> T::Companion,
    ) -> ManagerResult<u64> {
        let companion = f(T::Companion::default());
        let entries = companion.entries();
        if entries.is_empty() {
            return Err(ManagerError::EmptyCompanion {
                table: self.table_name(),
            });
        }
        let statement: Statement = self.state.build_update_statement(entries).into();
        Ok(self.db().executor().write(&statement).await?.affected)
    }

    /// Delete every matching row. Returns the affected row count.
    pub async fn delete(&self) -> ManagerResult<u64> {
        let statement = self.delete_statement();
        Ok(self.db().executor().write(&statement).await?.affected)
    }
}

// =============================================================================
// Root-only operations
// =============================================================================

impl<T: Table> TableManager<T, Insertable> {
    fn insert_statement(&self, companion: &T::Companion, options: &InsertOptions) -> Insert {
        let mut insert = self.state.build_insert_statement(companion.entries());
        if let Some(mode) = options.mode {
            insert = insert.mode(mode);
        }
        if let Some(conflict) = &options.on_conflict {
            insert = insert.on_conflict(conflict.clone());
        }
        insert
    }

    /// Insert one row. Returns its row id, or `None` when the insert mode
    /// skipped it.
    pub async fn create(
        &self,
        f: impl FnOnce(T::Companion) -> T::Companion,
    ) -> ManagerResult<Option<i64>> {
        self.create_with(f, InsertOptions::default()).await
    }

    pub async fn create_with(
        &self,
        f: impl FnOnce(T::Companion) -> T::Companion,
        options: InsertOptions,
    ) -> ManagerResult<Option<i64>> {
        let companion = f(T::Companion::default());
        let statement: Statement = self.insert_statement(&companion, &options).into();
        Ok(self.db().executor().write(&statement).await?.last_insert_id)
    }

    /// Insert one row and read it back as stored. Fails with
    /// [`ManagerError::NoRowInserted`] when nothing was persisted.
    pub async fn create_returning(
        &self,
        f: impl FnOnce(T::Companion) -> T::Companion,
        options: InsertOptions,
    ) -> ManagerResult<T::Row> {
        self.create_returning_or_null(f, options)
            .await?
            .ok_or_else(|| ManagerError::NoRowInserted {
                table: self.table_name(),
            })
    }

    pub async fn create_returning_or_null(
        &self,
        f: impl FnOnce(T::Companion) -> T::Companion,
        options: InsertOptions,
    ) -> ManagerResult<Option<T::Row>> {
        let companion = f(T::Companion::default());
        let statement: Statement = self
            .insert_statement(&companion, &options)
            .returning([star()])
            .into();
        let result = self.db().executor().write(&statement).await?;
        match result.rows.first() {
            Some(row) => Ok(Some(self.table().map_row(row)?)),
            None => Ok(None),
        }
    }

    /// Insert every companion atomically. Returns the number of rows
    /// persisted.
    pub async fn bulk_create(&self, companions: Vec<T::Companion>) -> ManagerResult<u64> {
        let options = InsertOptions::default();
        let statements = companions
            .iter()
            .map(|c| self.insert_statement(c, &options).into())
            .collect();
        let results = self.db().executor().batch(statements).await?;
        Ok(results.iter().map(|r| r.affected).sum())
    }

    fn replace_statement(&self, companion: &T::Companion) -> ManagerResult<Statement> {
        let table = self.table();
        let schema = table.schema();
        let entries = companion.entries();
        let lookup = |column: &str| {
            entries
                .iter()
                .find(|(name, _)| *name == column)
                .map(|(_, v)| v.clone())
        };

        let key = table.primary_key();
        let mut key_filter: Option<Expr> = None;
        for column in &key {
            let v = lookup(column).ok_or_else(|| ManagerError::MissingPrimaryKey {
                table: self.table_name(),
                column: column.clone(),
            })?;
            let predicate = col(column).eq(v);
            key_filter = Some(match key_filter {
                Some(existing) => existing.and(predicate),
                None => predicate,
            });
        }

        let mut update = Update::table(table.actual_name());
        for column in &schema.columns {
            if key.contains(&column.name) {
                continue;
            }
            let v: Value = lookup(&column.name).unwrap_or_else(|| column.replace_default());
            update = update.set(column.name.as_str(), v);
        }
        // Every column is part of the key: a self-assignment still reports
        // whether the row exists.
        if update.set.is_empty() {
            if let Some(first) = key.first() {
                update = update.set(first.as_str(), col(first));
            }
        }
        if let Some(filter) = key_filter {
            update = update.filter(filter);
        }
        Ok(update.into())
    }

    /// Overwrite the row with the companion's primary key. Columns the
    /// companion leaves unset are reset to their declared default or NULL.
    /// Returns whether a row was replaced.
    pub async fn replace(&self, companion: T::Companion) -> ManagerResult<bool> {
        let statement = self.replace_statement(&companion)?;
        Ok(self.db().executor().write(&statement).await?.affected > 0)
    }

    /// Replace every companion atomically. Returns how many rows were
    /// replaced.
    pub async fn bulk_replace(&self, companions: Vec<T::Companion>) -> ManagerResult<u64> {
        let statements = companions
            .iter()
            .map(|c| self.replace_statement(c))
            .collect::<ManagerResult<Vec<_>>>()?;
        let results = self.db().executor().batch(statements).await?;
        Ok(results.iter().filter(|r| r.affected > 0).count() as u64)
    }
}

// =============================================================================
// Single-row contract
// =============================================================================

fn exactly_one<R>(table: &str, rows: Vec<R>) -> ManagerResult<R> {
    match at_most_one(table, rows)? {
        Some(row) => Ok(row),
        None => Err(ManagerError::NoRows {
            table: table.to_string(),
        }),
    }
}

fn at_most_one<R>(table: &str, rows: Vec<R>) -> ManagerResult<Option<R>> {
    if rows.len() > 1 {
        return Err(ManagerError::TooManyRows {
            table: table.to_string(),
            count: rows.len(),
        });
    }
    Ok(rows.into_iter().next())
}
