//! Immutable query state and statement resolution.
//!
//! # Design
//!
//! - A state never changes after construction; [`TableManagerState::copy_with`]
//!   clones, applies the edit and returns the copy
//! - Resolution happens once per terminal operation and yields either a
//!   simple single-table select or a joined select ([`ResolvedSelect`])
//! - Writes never target a join: when the filter needs one, the base table's
//!   primary key is constrained to a subquery instead

use std::fmt;
use std::sync::Arc;

use super::group_by::{apply_group_by, GroupByBuilder};
use super::join::{JoinBuilder, JoinSet};
use super::table::{ColumnRef, Table};
use crate::executor::Database;
use crate::sql::{
    col, count_star, Delete, Expr, ExprExt, Insert, OrderingTerm, Select, SelectItem,
    Update,
};
use crate::value::Value;

/// Alias of the subquery a count wraps.
const COUNT_SUBQUERY_ALIAS: &str = "q";

/// Result column of count statements.
pub const COUNT_COLUMN: &str = "count";

/// Result column of exists statements.
pub const EXISTS_COLUMN: &str = "exists";

// =============================================================================
// Resolved select
// =============================================================================

/// Shape a select resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSelect {
    /// Base table only; rows come straight back as `SELECT *`.
    Simple(Select),
    /// Joins, grouping or an explicit target list.
    Joined(Select),
}

impl ResolvedSelect {
    pub fn is_joined(&self) -> bool {
        matches!(self, ResolvedSelect::Joined(_))
    }

    pub fn select(&self) -> &Select {
        match self {
            ResolvedSelect::Simple(select) | ResolvedSelect::Joined(select) => select,
        }
    }

    pub fn into_select(self) -> Select {
        match self {
            ResolvedSelect::Simple(select) | ResolvedSelect::Joined(select) => select,
        }
    }
}

// =============================================================================
// State
// =============================================================================

/// Everything a manager has accumulated for one table.
#[derive(Clone)]
pub struct TableManagerState<T: Table> {
    pub(crate) db: Database,
    pub(crate) table: T,
    pub(crate) filter: Option<Expr>,
    pub(crate) joins: JoinSet,
    pub(crate) group_by: Vec<GroupByBuilder>,
    pub(crate) orderings: Vec<OrderingTerm>,
    pub(crate) distinct: bool,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) prefetched: Option<Arc<Vec<T::Row>>>,
}

impl<T: Table> TableManagerState<T> {
    pub fn new(db: Database, table: T) -> Self {
        Self {
            db,
            table,
            filter: None,
            joins: JoinSet::new(),
            group_by: Vec::new(),
            orderings: Vec::new(),
            distinct: true,
            limit: None,
            offset: None,
            prefetched: None,
        }
    }

    /// A new state with `edit` applied. Prefetched rows never survive an
    /// edit.
    #[must_use]
    pub fn copy_with(&self, edit: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        next.prefetched = None;
        edit(&mut next);
        next
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn filter(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    pub fn joins(&self) -> &JoinSet {
        &self.joins
    }

    pub fn group_by(&self) -> &[GroupByBuilder] {
        &self.group_by
    }

    pub fn orderings(&self) -> &[OrderingTerm] {
        &self.orderings
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn prefetched(&self) -> Option<&Arc<Vec<T::Row>>> {
        self.prefetched.as_ref()
    }

    fn has_pagination(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    fn paginate(&self, mut select: Select) -> Select {
        if let Some(limit) = self.limit {
            select = select.limit(limit);
        }
        if let Some(offset) = self.offset {
            select = select.offset(offset);
        }
        select
    }

    // -------------------------------------------------------------------------
    // Selects
    // -------------------------------------------------------------------------

    /// Resolve into a select over the base table.
    ///
    /// Without target columns a joined select projects every base column
    /// under its bare name, so rows map the same way in both shapes.
    pub fn build_select_statement(&self, target_columns: Option<&[ColumnRef]>) -> ResolvedSelect {
        let joins: Vec<_> = self.joins.iter().map(JoinBuilder::build_join).collect();

        if joins.is_empty() && self.group_by.is_empty() && target_columns.is_none() {
            let mut select = Select::from(self.table.table_ref());
            if let Some(filter) = &self.filter {
                select = select.filter(filter.clone());
            }
            let select = self.paginate(select.order_by(self.orderings.clone()));
            tracing::trace!(table = %self.table.actual_name(), "resolved simple select");
            return ResolvedSelect::Simple(select);
        }

        let projection: Vec<SelectItem> = match target_columns {
            Some(columns) => columns.iter().map(|c| SelectItem::new(c.expr())).collect(),
            None => self
                .table
                .all_columns()
                .into_iter()
                .map(|c| SelectItem::new(c.expr()).with_alias(&c.name))
                .collect(),
        };

        let mut select = Select::from(self.table.table_ref())
            .distinct(self.distinct && !joins.is_empty())
            .project(projection);
        for join in joins {
            select = select.join(join);
        }
        if let Some(filter) = &self.filter {
            select = select.filter(filter.clone());
        }
        let select = apply_group_by(&self.group_by, select).order_by(self.orderings.clone());
        let select = self.paginate(select);

        tracing::trace!(
            table = %self.table.actual_name(),
            joins = self.joins.len(),
            groups = self.group_by.len(),
            "resolved joined select"
        );
        ResolvedSelect::Joined(select)
    }

    /// `SELECT COUNT(*) AS count ...`.
    ///
    /// Counted over the whole resolved select whenever joins, grouping or
    /// pagination could change the number of base rows.
    pub fn build_count_statement(&self) -> Select {
        let count = SelectItem::new(count_star()).with_alias(COUNT_COLUMN);

        if self.joins.is_empty() && self.group_by.is_empty() && !self.has_pagination() {
            let mut select = Select::from(self.table.table_ref()).project([count]);
            if let Some(filter) = &self.filter {
                select = select.filter(filter.clone());
            }
            return select;
        }

        let inner = self.build_select_statement(None).into_select();
        Select::from_subquery(inner, COUNT_SUBQUERY_ALIAS).project([count])
    }

    /// `SELECT EXISTS (<resolved select>) AS exists`.
    pub fn build_exists_statement(&self) -> Select {
        let inner = self.build_select_statement(None).into_select();
        Select::scalar(SelectItem::new(Expr::Exists(Box::new(inner))).with_alias(EXISTS_COLUMN))
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Predicate a write applies to the base table.
    fn write_filter(&self) -> Option<Expr> {
        if self.joins.is_empty() && self.group_by.is_empty() && !self.has_pagination() {
            return self.filter.clone();
        }

        let key = self.table.primary_key();
        let targets: Vec<ColumnRef> = key.iter().map(|c| self.table.column_ref(c)).collect();
        let subquery = self.build_select_statement(Some(&targets)).into_select();

        let lhs = match key.as_slice() {
            [single] => col(single),
            columns => Expr::Tuple(columns.iter().map(|c| col(c)).collect()),
        };
        tracing::trace!(table = %self.table.actual_name(), "write rewritten to key subquery");
        Some(lhs.in_subquery(subquery))
    }

    pub fn build_update_statement(&self, entries: Vec<(&'static str, Value)>) -> Update {
        let mut update = Update::table(self.table.actual_name());
        for (column, v) in entries {
            update = update.set(column, v);
        }
        match self.write_filter() {
            Some(filter) => update.filter(filter),
            None => update,
        }
    }

    pub fn build_delete_statement(&self) -> Delete {
        let delete = Delete::from(self.table.actual_name());
        match self.write_filter() {
            Some(filter) => delete.filter(filter),
            None => delete,
        }
    }

    pub fn build_insert_statement(&self, entries: Vec<(&'static str, Value)>) -> Insert {
        let (columns, values): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        Insert::into(self.table.actual_name())
            .columns(columns)
            .values(values)
            .mode(self.db.settings().insert.default_mode)
    }
}

impl<T: Table> fmt::Debug for TableManagerState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableManagerState")
            .field("table", &self.table.actual_name())
            .field("alias", &self.table.alias())
            .field("filter", &self.filter)
            .field("joins", &self.joins.len())
            .field("group_by", &self.group_by)
            .field("orderings", &self.orderings)
            .field("distinct", &self.distinct)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("prefetched", &self.prefetched.as_ref().map(|rows| rows.len()))
            .finish()
    }
}
