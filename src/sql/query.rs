//! SELECT statement builder.

use super::dialect::{Dialect, SqlDialect};
use super::expr::{Expr, ExprExt};
use super::token::{CompiledSql, Token, TokenStream};

// =============================================================================
// Select Item (expression with optional alias)
// =============================================================================

/// A SELECT list item: expression with optional alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = self.expr.to_tokens();
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

impl From<Expr> for SelectItem {
    fn from(expr: Expr) -> Self {
        SelectItem::new(expr)
    }
}

// =============================================================================
// Table Reference
// =============================================================================

/// A table reference with optional alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[must_use = "builders have no effect until used"]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name columns of this table are qualified with.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Ident(self.name.clone()));
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

/// What a SELECT reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum FromSource {
    Table(TableRef),
    Subquery { select: Box<Select>, alias: String },
}

// =============================================================================
// Joins
// =============================================================================

/// Type of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Expr,
}

impl Join {
    pub fn left_outer(table: TableRef, on: Expr) -> Self {
        Self {
            kind: JoinKind::LeftOuter,
            table,
            on,
        }
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        match self.kind {
            JoinKind::Inner => ts.push(Token::Inner),
            JoinKind::LeftOuter => ts.push(Token::Left).space().push(Token::Outer),
        };

        ts.space().push(Token::Join).space();
        ts.append(&self.table.to_tokens());
        ts.space().push(Token::On).space();
        ts.append(&self.on.to_tokens());
        ts
    }
}

// =============================================================================
// ORDER BY
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// NULLS ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct OrderingTerm {
    pub expr: Expr,
    pub dir: SortDir,
    pub nulls: Option<NullsOrder>,
}

impl OrderingTerm {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            dir: SortDir::Asc,
            nulls: None,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            dir: SortDir::Desc,
            nulls: None,
        }
    }

    pub fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = self.expr.to_tokens();
        ts.space().push(match self.dir {
            SortDir::Asc => Token::Asc,
            SortDir::Desc => Token::Desc,
        });
        if let Some(nulls) = self.nulls {
            ts.space().push(match nulls {
                NullsOrder::First => Token::NullsFirst,
                NullsOrder::Last => Token::NullsLast,
            });
        }
        ts
    }
}

// =============================================================================
// Select
// =============================================================================

/// A SELECT statement.
///
/// An empty projection renders as `*`.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Option<FromSource>,
    pub joins: Vec<Join>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderingTerm>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    /// SELECT * FROM table
    pub fn from(table: TableRef) -> Self {
        Self {
            from: Some(FromSource::Table(table)),
            ..Default::default()
        }
    }

    /// SELECT * FROM (subquery) AS alias
    pub fn from_subquery(select: Select, alias: &str) -> Self {
        Self {
            from: Some(FromSource::Subquery {
                select: Box::new(select),
                alias: alias.into(),
            }),
            ..Default::default()
        }
    }

    /// A SELECT without a FROM clause, e.g. `SELECT EXISTS (...)`.
    pub fn scalar(item: SelectItem) -> Self {
        Self {
            projection: vec![item],
            ..Default::default()
        }
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Replace the SELECT list.
    pub fn project(mut self, items: impl IntoIterator<Item = impl Into<SelectItem>>) -> Self {
        self.projection = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Add a WHERE condition (ANDed with existing conditions).
    pub fn filter(mut self, condition: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn group_by(mut self, exprs: Vec<Expr>) -> Self {
        self.group_by = exprs;
        self
    }

    pub fn having(mut self, condition: Expr) -> Self {
        self.having = Some(condition);
        self
    }

    pub fn order_by(mut self, terms: Vec<OrderingTerm>) -> Self {
        self.order_by = terms;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Names of every table this statement reads, including subqueries.
    pub fn read_tables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_tables(&mut out);
        out
    }

    pub(crate) fn collect_tables(&self, out: &mut Vec<String>) {
        let mut add = |name: &str| {
            if !out.iter().any(|t| t == name) {
                out.push(name.to_string());
            }
        };
        match &self.from {
            Some(FromSource::Table(table)) => add(&table.name),
            Some(FromSource::Subquery { .. }) | None => {}
        }
        for join in &self.joins {
            add(&join.table.name);
        }

        if let Some(FromSource::Subquery { select, .. }) = &self.from {
            select.collect_tables(out);
        }
        let exprs = self
            .projection
            .iter()
            .map(|item| &item.expr)
            .chain(self.filter.iter())
            .chain(self.having.iter());
        let mut nested = Vec::new();
        for expr in exprs {
            expr.collect_tables(&mut nested);
        }
        for name in nested {
            if !out.contains(&name) {
                out.push(name);
            }
        }
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    pub fn compile(&self, dialect: Dialect) -> CompiledSql {
        self.to_tokens(dialect).compile(dialect)
    }

    /// Convert to token stream for a specific dialect.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Select);
        if self.distinct {
            ts.space().push(Token::Distinct);
        }
        ts.space();
        if self.projection.is_empty() {
            ts.push(Token::Star);
        } else {
            ts.comma_separated(&self.projection, SelectItem::to_tokens);
        }

        match &self.from {
            Some(FromSource::Table(table)) => {
                ts.space().push(Token::From).space();
                ts.append(&table.to_tokens());
            }
            Some(FromSource::Subquery { select, alias }) => {
                ts.space().push(Token::From).space().lparen();
                ts.append(&select.to_tokens(dialect));
                ts.rparen()
                    .space()
                    .push(Token::As)
                    .space()
                    .push(Token::Ident(alias.clone()));
            }
            None => {}
        }

        for join in &self.joins {
            ts.space().append(&join.to_tokens());
        }

        if let Some(filter) = &self.filter {
            ts.space().push(Token::Where).space();
            ts.append(&filter.to_tokens());
        }

        if !self.group_by.is_empty() {
            ts.space().push(Token::GroupBy).space();
            ts.comma_separated(&self.group_by, Expr::to_tokens);
        }

        if let Some(having) = &self.having {
            ts.space().push(Token::Having).space();
            ts.append(&having.to_tokens());
        }

        if !self.order_by.is_empty() {
            ts.space().push(Token::OrderBy).space();
            ts.comma_separated(&self.order_by, OrderingTerm::to_tokens);
        }

        let pagination = dialect.emit_limit_offset(self.limit, self.offset);
        if !pagination.is_empty() {
            ts.space().append(&pagination);
        }

        ts
    }
}
