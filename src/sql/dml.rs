//! DML (Data Manipulation Language) support.
//!
//! INSERT, UPDATE and DELETE statements plus the [`Statement`] wrapper the
//! executor consumes.
//!
//! ```ignore
//! use relman::sql::{Insert, Update, Delete, col, value, ExprExt};
//!
//! let insert = Insert::into("todos")
//!     .columns(["title"])
//!     .values([value("write docs")]);
//!
//! let update = Update::table("todos")
//!     .set("done", value(true))
//!     .filter(col("id").eq(value(1_i64)));
//!
//! let delete = Delete::from("todos").filter(col("done").eq(value(true)));
//! ```

use serde::{Deserialize, Serialize};

use super::dialect::{Dialect, SqlDialect};
use super::expr::{Expr, ExprExt};
use super::query::{Select, SelectItem};
use super::token::{CompiledSql, Token, TokenStream};

// ============================================================================
// Insert modes and conflict handling
// ============================================================================

/// How an INSERT behaves when it collides with an existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertMode {
    #[default]
    Insert,
    InsertOrReplace,
    InsertOrIgnore,
    InsertOrAbort,
    InsertOrFail,
    InsertOrRollback,
}

/// Explicit `ON CONFLICT` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum OnConflict {
    DoNothing {
        target: Vec<String>,
    },
    DoUpdate {
        target: Vec<String>,
        set: Vec<(String, Expr)>,
    },
}

impl OnConflict {
    /// ON CONFLICT DO NOTHING
    pub fn do_nothing() -> Self {
        OnConflict::DoNothing { target: Vec::new() }
    }

    /// ON CONFLICT (target) DO UPDATE SET ...
    pub fn do_update(target: Vec<String>, set: Vec<(String, Expr)>) -> Self {
        OnConflict::DoUpdate { target, set }
    }

    pub fn with_target(self, target: Vec<String>) -> Self {
        match self {
            OnConflict::DoNothing { .. } => OnConflict::DoNothing { target },
            OnConflict::DoUpdate { set, .. } => OnConflict::DoUpdate { target, set },
        }
    }

    pub fn target(&self) -> &[String] {
        match self {
            OnConflict::DoNothing { target } | OnConflict::DoUpdate { target, .. } => target,
        }
    }
}

// ============================================================================
// INSERT
// ============================================================================

/// INSERT statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until executed"]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Expr>>,
    pub mode: InsertMode,
    pub on_conflict: Option<OnConflict>,
    pub returning: Vec<SelectItem>,
}

impl Insert {
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            mode: InsertMode::Insert,
            on_conflict: None,
            returning: Vec::new(),
        }
    }

    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Add a row of values.
    pub fn values(mut self, vals: impl IntoIterator<Item = impl Into<Expr>>) -> Self {
        self.rows.push(vals.into_iter().map(Into::into).collect());
        self
    }

    pub fn mode(mut self, mode: InsertMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn on_conflict(mut self, conflict: OnConflict) -> Self {
        self.on_conflict = Some(conflict);
        self
    }

    pub fn returning(mut self, items: impl IntoIterator<Item = impl Into<SelectItem>>) -> Self {
        self.returning = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let on_conflict = self.on_conflict.as_ref();

        let mut ts = dialect.emit_insert_head(self.mode, on_conflict);
        ts.space().push(Token::Ident(self.table.clone()));

        if self.columns.is_empty() || self.rows.is_empty() {
            ts.space().push(Token::Default).space().push(Token::Values);
        } else {
            ts.space().lparen();
            ts.comma_separated(&self.columns, |c| {
                let mut t = TokenStream::new();
                t.push(Token::Ident(c.clone()));
                t
            });
            ts.rparen().space().push(Token::Values).space();
            ts.comma_separated(&self.rows, |row| {
                let mut t = TokenStream::new();
                t.lparen().comma_separated(row, Expr::to_tokens).rparen();
                t
            });
        }

        if let Some(conflict) = on_conflict {
            let clause = dialect.emit_on_conflict(conflict);
            if !clause.is_empty() {
                ts.space().append(&clause);
            }
        }

        emit_returning(&mut ts, &self.returning);
        ts
    }
}

// ============================================================================
// UPDATE
// ============================================================================

/// UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until executed"]
pub struct Update {
    pub table: String,
    pub set: Vec<(String, Expr)>,
    pub filter: Option<Expr>,
    pub returning: Vec<SelectItem>,
}

impl Update {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set: Vec::new(),
            filter: None,
            returning: Vec::new(),
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.set.push((column.into(), value.into()));
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

    pub fn returning(mut self, items: impl IntoIterator<Item = impl Into<SelectItem>>) -> Self {
        self.returning = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Update)
            .space()
            .push(Token::Ident(self.table.clone()))
            .space()
            .push(Token::Set)
            .space();
        ts.comma_separated(&self.set, |(column, expr)| {
            let mut t = TokenStream::new();
            t.push(Token::Ident(column.clone()))
                .space()
                .push(Token::Eq)
                .space()
                .append(&expr.to_tokens());
            t
        });

        if let Some(filter) = &self.filter {
            ts.space().push(Token::Where).space();
            ts.append(&filter.to_tokens());
        }

        emit_returning(&mut ts, &self.returning);
        ts
    }
}

// ============================================================================
// DELETE
// ============================================================================

/// DELETE statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until executed"]
pub struct Delete {
    pub table: String,
    pub filter: Option<Expr>,
    pub returning: Vec<SelectItem>,
}

impl Delete {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            returning: Vec::new(),
        }
    }

    pub fn filter(mut self, condition: Expr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Delete)
            .space()
            .push(Token::From)
            .space()
            .push(Token::Ident(self.table.clone()));

        if let Some(filter) = &self.filter {
            ts.space().push(Token::Where).space();
            ts.append(&filter.to_tokens());
        }

        emit_returning(&mut ts, &self.returning);
        ts
    }
}

fn emit_returning(ts: &mut TokenStream, returning: &[SelectItem]) {
    if returning.is_empty() {
        return;
    }
    ts.space().push(Token::Returning).space();
    ts.comma_separated(returning, SelectItem::to_tokens);
}

// ============================================================================
// Statement
// ============================================================================

/// Any statement an executor can run.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Statement {
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        match self {
            Statement::Select(s) => s.to_tokens(dialect),
            Statement::Insert(s) => s.to_tokens(dialect),
            Statement::Update(s) => s.to_tokens(),
            Statement::Delete(s) => s.to_tokens(),
        }
    }

    /// Display SQL with values inlined.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// SQL with placeholders plus bound parameters.
    pub fn compile(&self, dialect: Dialect) -> CompiledSql {
        self.to_tokens(dialect).compile(dialect)
    }

    /// Whether executing this statement yields rows.
    pub fn returns_rows(&self) -> bool {
        match self {
            Statement::Select(_) => true,
            Statement::Insert(s) => !s.returning.is_empty(),
            Statement::Update(s) => !s.returning.is_empty(),
            Statement::Delete(s) => !s.returning.is_empty(),
        }
    }

    /// Table modified by this statement, if any.
    pub fn written_table(&self) -> Option<&str> {
        match self {
            Statement::Select(_) => None,
            Statement::Insert(s) => Some(&s.table),
            Statement::Update(s) => Some(&s.table),
            Statement::Delete(s) => Some(&s.table),
        }
    }

    /// Tables read by this statement.
    pub fn read_tables(&self) -> Vec<String> {
        let mut out = Vec::new();
        match self {
            Statement::Select(s) => s.collect_tables(&mut out),
            Statement::Insert(_) => {}
            Statement::Update(s) => {
                if let Some(f) = &s.filter {
                    f.collect_tables(&mut out);
                }
            }
            Statement::Delete(s) => {
                if let Some(f) = &s.filter {
                    f.collect_tables(&mut out);
                }
            }
        }
        out
    }
}

impl From<Select> for Statement {
    fn from(s: Select) -> Self {
        Statement::Select(s)
    }
}

impl From<Insert> for Statement {
    fn from(s: Insert) -> Self {
        Statement::Insert(s)
    }
}

impl From<Update> for Statement {
    fn from(s: Update) -> Self {
        Statement::Update(s)
    }
}

impl From<Delete> for Statement {
    fn from(s: Delete) -> Self {
        Statement::Delete(s)
    }
}
