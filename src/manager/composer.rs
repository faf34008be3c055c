//! Filter and ordering composers.
//!
//! A composer is bound to a table handle plus the joins taken to reach it.
//! The same composer type serves as the root accessor of its table and as
//! a nested accessor reached through a relation; only the state differs.
//!
//! Every result a composer produces ([`Filter`], [`Ordering`],
//! [`AggregateFilter`]) carries the joins it needs, so callers merge join
//! requirements without looking inside nested composers.

use std::ops::{BitAnd, BitOr, Not};

use super::join::{join_alias, JoinBuilder, JoinSet};
use super::table::{Column, Relation, Table};
use crate::sql::{
    func, value, BinaryOperator, Expr, ExprExt, NullsOrder, OrderingTerm, SortDir,
};
use crate::value::Value;

// =============================================================================
// Composer state
// =============================================================================

/// Table handle and join chain a composer is bound to.
#[derive(Debug, Clone)]
pub struct ComposerState<T: Table> {
    pub table: T,
    pub joins: JoinSet,
}

impl<T: Table> ComposerState<T> {
    /// State of the root composer of `table`.
    pub fn root(table: T) -> Self {
        Self {
            table,
            joins: JoinSet::new(),
        }
    }
}

/// A filter or ordering composer.
pub trait Composer: Sized + Send + Sync + 'static {
    type Table: Table;

    fn new(state: ComposerState<Self::Table>) -> Self;

    fn state(&self) -> &ComposerState<Self::Table>;
}

// =============================================================================
// Builder helpers
// =============================================================================

/// Wrap a column of the composer's own table with the joins already taken
/// and hand both to `build`. No join is added.
pub fn composable_builder<T, V, Out>(
    state: &ComposerState<T>,
    column: &str,
    build: impl FnOnce(Column<V>, JoinSet) -> Out,
) -> Out
where
    T: Table,
{
    build(state.table.column(column), state.joins.clone())
}

/// Traverse `current_column -> referenced_table.referenced_column`.
///
/// The referenced table is aliased from the column pair and the nested
/// composer's join chain is this composer's chain plus the new entry.
pub fn composer_builder<T, C>(
    state: &ComposerState<T>,
    current_column: &str,
    referenced_table: &C::Table,
    referenced_column: &str,
) -> C
where
    T: Table,
    C: Composer,
{
    let current = state.table.column_ref(current_column);
    let alias = join_alias(&current, referenced_table.actual_name(), referenced_column);
    let aliased = referenced_table.with_alias(&alias);

    let join = JoinBuilder::new(
        state.table.table_ref(),
        current,
        aliased.table_ref(),
        aliased.column_ref(referenced_column),
    );
    let mut joins = state.joins.clone();
    joins.insert(join);

    C::new(ComposerState {
        table: aliased,
        joins,
    })
}

/// Nested composer for a forward relation (`todo.category`).
pub fn relation_composer<T, R, C>(state: &ComposerState<T>, relation: &Relation<T, R>) -> C
where
    T: Table,
    R: Table,
    C: Composer<Table = R>,
{
    composer_builder(
        state,
        relation.local_column(),
        relation.remote(),
        relation.remote_column(),
    )
}

/// Callback accessor for a reverse relation (`category.todos_refs(|t| ...)`).
///
/// The callback describes the related rows; exactly one join entry is
/// contributed for the reverse edge.
pub fn reverse_composer<T, R, C, Out>(
    state: &ComposerState<T>,
    relation: &Relation<T, R>,
    build: impl FnOnce(C) -> Out,
) -> Out
where
    T: Table,
    R: Table,
    C: Composer<Table = R>,
{
    build(relation_composer(state, relation))
}

// =============================================================================
// Filter
// =============================================================================

/// A boolean predicate and the joins needed to evaluate it.
///
/// An empty filter (`expr == None`) matches everything and is the identity
/// of both AND and OR.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub expr: Option<Expr>,
    pub joins: JoinSet,
}

impl Filter {
    pub fn new(expr: Expr, joins: JoinSet) -> Self {
        Self {
            expr: Some(expr),
            joins,
        }
    }

    /// Filter that constrains nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn and(self, other: Filter) -> Filter {
        self.combine(other, BinaryOperator::And)
    }

    #[must_use]
    pub fn or(self, other: Filter) -> Filter {
        self.combine(other, BinaryOperator::Or)
    }

    fn combine(self, other: Filter, op: BinaryOperator) -> Filter {
        let expr = combine_exprs(self.expr, other.expr, op);
        Filter {
            expr,
            joins: self.joins.union(&other.joins),
        }
    }
}

/// Null-aware combination: a missing side yields the other side unchanged.
pub fn combine_exprs(left: Option<Expr>, right: Option<Expr>, op: BinaryOperator) -> Option<Expr> {
    match (left, right) {
        (None, None) => None,
        (Some(e), None) | (None, Some(e)) => Some(e),
        (Some(l), Some(r)) => Some(Expr::binary(l, op, r)),
    }
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        self.and(rhs)
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        self.or(rhs)
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        Filter {
            expr: self.expr.map(ExprExt::not),
            joins: self.joins,
        }
    }
}

// =============================================================================
// Ordering
// =============================================================================

/// Ordering terms and the joins they need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ordering {
    pub terms: Vec<OrderingTerm>,
    pub joins: JoinSet,
}

impl Ordering {
    pub fn new(term: OrderingTerm, joins: JoinSet) -> Self {
        Self {
            terms: vec![term],
            joins,
        }
    }

    /// Order by `self`, then by `next` for ties.
    #[must_use]
    pub fn then(mut self, next: Ordering) -> Ordering {
        self.terms.extend(next.terms);
        self.joins.extend(&next.joins);
        self
    }
}

impl BitAnd for Ordering {
    type Output = Ordering;

    fn bitand(self, rhs: Ordering) -> Ordering {
        self.then(rhs)
    }
}

// =============================================================================
// Column filters
// =============================================================================

const LIKE_ESCAPE: char = '\\';

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Filters on one column.
#[derive(Debug, Clone)]
pub struct ColumnFilters<V> {
    column: Column<V>,
    joins: JoinSet,
}

impl<V> ColumnFilters<V> {
    pub fn new(column: Column<V>, joins: JoinSet) -> Self {
        Self { column, joins }
    }

    pub fn column(&self) -> &Column<V> {
        &self.column
    }

    fn filter(&self, expr: Expr) -> Filter {
        Filter::new(expr, self.joins.clone())
    }

    pub fn is_null(&self) -> Filter {
        self.filter(self.column.expr().is_null())
    }

    pub fn is_not_null(&self) -> Filter {
        self.filter(self.column.expr().is_not_null())
    }

    /// Arbitrary predicate over the column expression.
    pub fn custom(&self, build: impl FnOnce(Expr) -> Expr) -> Filter {
        self.filter(build(self.column.expr()))
    }

    fn aggregate(&self, name: &str, distinct: bool) -> Aggregate {
        Aggregate {
            expr: Expr::Function {
                name: name.into(),
                args: vec![self.column.expr()],
                distinct,
            },
            joins: self.joins.clone(),
        }
    }

    /// COUNT(column): NULLs, including rows produced by an unmatched outer
    /// join, are not counted.
    pub fn count(&self) -> Aggregate {
        self.aggregate("COUNT", false)
    }

    pub fn count_distinct(&self) -> Aggregate {
        self.aggregate("COUNT", true)
    }

    pub fn sum(&self) -> Aggregate {
        self.aggregate("SUM", false)
    }

    pub fn avg(&self) -> Aggregate {
        self.aggregate("AVG", false)
    }

    pub fn min(&self) -> Aggregate {
        self.aggregate("MIN", false)
    }

    pub fn max(&self) -> Aggregate {
        self.aggregate("MAX", false)
    }
}

impl<V: Into<Value>> ColumnFilters<V> {
    fn bind(v: impl Into<V>) -> Expr {
        let v: V = v.into();
        Expr::Value(v.into())
    }

    pub fn equals(&self, v: impl Into<V>) -> Filter {
        self.filter(self.column.expr().eq(Self::bind(v)))
    }

    pub fn not_equals(&self, v: impl Into<V>) -> Filter {
        self.filter(self.column.expr().ne(Self::bind(v)))
    }

    pub fn is_in(&self, values: impl IntoIterator<Item = V>) -> Filter {
        let values = values.into_iter().map(|v| Expr::Value(v.into())).collect();
        self.filter(self.column.expr().in_list(values))
    }

    pub fn is_not_in(&self, values: impl IntoIterator<Item = V>) -> Filter {
        let values = values.into_iter().map(|v| Expr::Value(v.into())).collect();
        self.filter(self.column.expr().not_in_list(values))
    }

    pub fn greater_than(&self, v: impl Into<V>) -> Filter {
        self.filter(self.column.expr().gt(Self::bind(v)))
    }

    pub fn greater_than_or_equal(&self, v: impl Into<V>) -> Filter {
        self.filter(self.column.expr().gte(Self::bind(v)))
    }

    pub fn less_than(&self, v: impl Into<V>) -> Filter {
        self.filter(self.column.expr().lt(Self::bind(v)))
    }

    pub fn less_than_or_equal(&self, v: impl Into<V>) -> Filter {
        self.filter(self.column.expr().lte(Self::bind(v)))
    }

    pub fn between(&self, low: impl Into<V>, high: impl Into<V>) -> Filter {
        self.filter(
            self.column
                .expr()
                .between(Self::bind(low), Self::bind(high)),
        )
    }
}

impl ColumnFilters<String> {
    fn like_escaped(&self, pattern: String) -> Filter {
        self.filter(Expr::LikeEscape {
            expr: Box::new(self.column.expr()),
            pattern: Box::new(value(pattern)),
            escape_char: LIKE_ESCAPE,
            negated: false,
        })
    }

    /// Substring match. `%` and `_` in `needle` match literally.
    pub fn contains(&self, needle: &str) -> Filter {
        self.like_escaped(format!("%{}%", escape_like(needle)))
    }

    pub fn starts_with(&self, prefix: &str) -> Filter {
        self.like_escaped(format!("{}%", escape_like(prefix)))
    }

    pub fn ends_with(&self, suffix: &str) -> Filter {
        self.like_escaped(format!("%{}", escape_like(suffix)))
    }

    /// Raw LIKE pattern.
    pub fn like(&self, pattern: &str) -> Filter {
        self.filter(self.column.expr().like(value(pattern)))
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// An aggregate over a column plus the joins it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub expr: Expr,
    pub joins: JoinSet,
}

impl Aggregate {
    fn predicate(&self, predicate: Expr) -> AggregateFilter {
        AggregateFilter {
            predicate,
            joins: self.joins.clone(),
        }
    }

    pub fn equals(&self, v: impl Into<Value>) -> AggregateFilter {
        self.predicate(self.expr.clone().eq(value(v)))
    }

    pub fn greater_than(&self, v: impl Into<Value>) -> AggregateFilter {
        self.predicate(self.expr.clone().gt(value(v)))
    }

    pub fn greater_than_or_equal(&self, v: impl Into<Value>) -> AggregateFilter {
        self.predicate(self.expr.clone().gte(value(v)))
    }

    pub fn less_than(&self, v: impl Into<Value>) -> AggregateFilter {
        self.predicate(self.expr.clone().lt(value(v)))
    }

    pub fn less_than_or_equal(&self, v: impl Into<Value>) -> AggregateFilter {
        self.predicate(self.expr.clone().lte(value(v)))
    }

    pub fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> AggregateFilter {
        self.predicate(self.expr.clone().between(value(low), value(high)))
    }
}

/// A HAVING predicate plus the joins it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateFilter {
    pub predicate: Expr,
    pub joins: JoinSet,
}

impl AggregateFilter {
    #[must_use]
    pub fn and(self, other: AggregateFilter) -> AggregateFilter {
        AggregateFilter {
            predicate: self.predicate.and(other.predicate),
            joins: self.joins.union(&other.joins),
        }
    }

    #[must_use]
    pub fn or(self, other: AggregateFilter) -> AggregateFilter {
        AggregateFilter {
            predicate: self.predicate.or(other.predicate),
            joins: self.joins.union(&other.joins),
        }
    }
}

// =============================================================================
// Column orderings
// =============================================================================

/// Orderings on one column.
#[derive(Debug, Clone)]
pub struct ColumnOrderings<V> {
    column: Column<V>,
    joins: JoinSet,
}

impl<V> ColumnOrderings<V> {
    pub fn new(column: Column<V>, joins: JoinSet) -> Self {
        Self { column, joins }
    }

    pub fn asc(&self) -> Ordering {
        self.order(SortDir::Asc, None)
    }

    pub fn desc(&self) -> Ordering {
        self.order(SortDir::Desc, None)
    }

    pub fn order(&self, dir: SortDir, nulls: Option<NullsOrder>) -> Ordering {
        let term = OrderingTerm {
            expr: self.column.expr(),
            dir,
            nulls,
        };
        Ordering::new(term, self.joins.clone())
    }
}

/// `COUNT(*)` of the current group, for HAVING predicates that do not
/// depend on a column.
pub fn group_size() -> Aggregate {
    Aggregate {
        expr: func("COUNT", vec![crate::sql::star()]),
        joins: JoinSet::new(),
    }
}
