//! Statement AST and SQL rendering.
//!
//! - [`query`] - SELECT statements
//! - [`expr`] - Expression AST and builder DSL
//! - [`dml`] - INSERT, UPDATE, DELETE and the [`Statement`] wrapper
//! - [`token`] - Token types and parameter compilation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod dml;
pub mod expr;
pub mod query;
pub mod token;


pub use dialect::{Dialect, SqlDialect};
pub use dml::{Delete, Insert, InsertMode, OnConflict, Statement, Update};
pub use expr::{
    col, count_star, func, star, table_col, value, BinaryOperator, Expr, ExprExt,
};
pub use query::{
    FromSource, Join, JoinKind, NullsOrder, OrderingTerm, Select, SelectItem, SortDir, TableRef,
};
pub use token::{CompiledSql, Token, TokenStream};
