//! Table contract implemented by generated bindings, plus typed column and
//! relation handles.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use super::companion::Companion;
use super::composer::Composer;
use crate::schema::{CatalogError, CatalogResult, RelationInfo, RelationKind, SqlType, TableSchema};
use crate::sql::{table_col, Expr, TableRef};
use crate::value::{Row, RowError, Value};

// =============================================================================
// Column references
// =============================================================================

/// A column of a (possibly aliased) table.
///
/// Identity is the qualifier plus the column name; the declared type is
/// carried along for callers but never compared.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    pub table: String,
    pub name: String,
    pub sql_type: Option<SqlType>,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            sql_type: None,
        }
    }

    /// `table.column`
    pub fn expr(&self) -> Expr {
        table_col(&self.table, &self.name)
    }
}

impl PartialEq for ColumnRef {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && self.name == other.name
    }
}

impl Eq for ColumnRef {}

impl Hash for ColumnRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}

/// A column whose values are `V`.
pub struct Column<V> {
    column: ColumnRef,
    _value: PhantomData<fn() -> V>,
}

impl<V> Column<V> {
    pub fn new(column: ColumnRef) -> Self {
        Self {
            column,
            _value: PhantomData,
        }
    }

    pub fn column_ref(&self) -> &ColumnRef {
        &self.column
    }

    pub fn name(&self) -> &str {
        &self.column.name
    }

    pub fn expr(&self) -> Expr {
        self.column.expr()
    }
}

impl<V> Clone for Column<V> {
    fn clone(&self) -> Self {
        Self::new(self.column.clone())
    }
}

impl<V> fmt::Debug for Column<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column").field(&self.column).finish()
    }
}

// =============================================================================
// Table contract
// =============================================================================

/// A table binding.
///
/// Generated code implements this once per schema table. A value of the
/// type is a handle on the table, optionally aliased; aliased handles are
/// what nested composers see after a join.
pub trait Table: Clone + Send + Sync + 'static {
    /// Row type read back from queries.
    type Row: Clone + Send + Sync + 'static;
    /// Insert / update payload.
    type Companion: Companion;
    /// Filter composer rooted at this table.
    type Filters: Composer<Table = Self>;
    /// Ordering composer rooted at this table.
    type Orderings: Composer<Table = Self>;

    fn schema(&self) -> &TableSchema;

    fn alias(&self) -> Option<&str>;

    /// Same table under another name.
    fn with_alias(&self, alias: &str) -> Self;

    /// Build a row from a result row keyed by bare column names.
    fn map_row(&self, row: &Row) -> Result<Self::Row, RowError>;

    /// Value of `column` in `row`, `None` for unknown columns.
    fn row_value(&self, row: &Self::Row, column: &str) -> Option<Value>;

    fn actual_name(&self) -> &str {
        &self.schema().name
    }

    /// Name columns are qualified with: the alias if set, else the table name.
    fn qualifier(&self) -> &str {
        self.alias().unwrap_or_else(|| self.actual_name())
    }

    fn table_ref(&self) -> TableRef {
        let table = TableRef::new(self.actual_name());
        match self.alias() {
            Some(alias) => table.with_alias(alias),
            None => table,
        }
    }

    fn column_ref(&self, name: &str) -> ColumnRef {
        ColumnRef {
            table: self.qualifier().to_string(),
            name: name.to_string(),
            sql_type: self.schema().find_column(name).map(|c| c.sql_type),
        }
    }

    fn column<V>(&self, name: &str) -> Column<V> {
        Column::new(self.column_ref(name))
    }

    /// Primary key columns. Tables without a declared key are identified by
    /// every column.
    fn primary_key(&self) -> Vec<String> {
        let schema = self.schema();
        if schema.primary_key.is_empty() {
            schema.column_names().map(String::from).collect()
        } else {
            schema.primary_key.clone()
        }
    }

    fn all_columns(&self) -> Vec<ColumnRef> {
        self.schema()
            .column_names()
            .map(|name| self.column_ref(name))
            .collect()
    }
}

// =============================================================================
// Relations
// =============================================================================

/// A named foreign-key relation seen from table `T`.
///
/// Forward: `T.local_column` references `R.remote_column` (at most one row).
/// Reverse: `R.remote_column` references `T.local_column` (any number of rows).
#[derive(Clone)]
pub struct Relation<T: Table, R: Table> {
    name: String,
    kind: RelationKind,
    local: T,
    local_column: String,
    remote: R,
    remote_column: String,
}

impl<T: Table, R: Table> Relation<T, R> {
    pub fn forward(
        name: impl Into<String>,
        local: T,
        local_column: impl Into<String>,
        remote: R,
        remote_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::Forward,
            local,
            local_column: local_column.into(),
            remote,
            remote_column: remote_column.into(),
        }
    }

    pub fn reverse(
        name: impl Into<String>,
        local: T,
        local_column: impl Into<String>,
        remote: R,
        remote_column: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationKind::Reverse,
            ..Self::forward(name, local, local_column, remote, remote_column)
        }
    }

    /// Bind a catalog relation to concrete table handles.
    pub fn from_info(info: &RelationInfo, local: T, remote: R) -> CatalogResult<Self> {
        if info.table != local.actual_name() {
            return Err(CatalogError::TableMismatch {
                accessor: info.accessor.clone(),
                expected: info.table.clone(),
                found: local.actual_name().to_string(),
            });
        }
        if info.remote_table != remote.actual_name() {
            return Err(CatalogError::TableMismatch {
                accessor: info.accessor.clone(),
                expected: info.remote_table.clone(),
                found: remote.actual_name().to_string(),
            });
        }
        Ok(Self {
            name: info.accessor.clone(),
            kind: info.kind,
            local,
            local_column: info.local_column.clone(),
            remote,
            remote_column: info.remote_column.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn local(&self) -> &T {
        &self.local
    }

    pub fn local_column(&self) -> &str {
        &self.local_column
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn remote_column(&self) -> &str {
        &self.remote_column
    }
}

impl<T: Table, R: Table> fmt::Debug for Relation<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("local", &format_args!("{}.{}", self.local.actual_name(), self.local_column))
            .field("remote", &format_args!("{}.{}", self.remote.actual_name(), self.remote_column))
            .finish()
    }
}
