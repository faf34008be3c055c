//! SQL dialect definitions and formatting rules.
//!
//! A dialect implements [`SqlDialect`] to decide how the statement AST is
//! spelled:
//!
//! - Identifier and string quoting
//! - Placeholders for bound values
//! - Boolean literals
//! - Pagination when only an OFFSET is present
//! - Insert conflict handling (`INSERT OR ...`, `ON CONFLICT`)
//!
//! SQLite is the only dialect the executors speak. Rendering for other
//! databases is out of scope.

mod helpers;
mod sqlite;

pub use sqlite::Sqlite;

use super::dml::{InsertMode, OnConflict};
use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
pub trait SqlDialect: std::fmt::Debug + Send + Sync {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    /// Placeholder for the `index`-th bound parameter (1-based).
    fn placeholder(&self, index: usize) -> String {
        let _ = index;
        "?".into()
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET or equivalent pagination clause.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream;

    // =========================================================================
    // DML
    // =========================================================================

    /// Emit the statement head up to and including `INTO`.
    fn emit_insert_head(&self, mode: InsertMode, on_conflict: Option<&OnConflict>) -> TokenStream;

    /// Emit an explicit conflict clause.
    fn emit_on_conflict(&self, on_conflict: &OnConflict) -> TokenStream {
        helpers::emit_on_conflict_standard(on_conflict)
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Sqlite,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Sqlite => &Sqlite,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn placeholder(&self, index: usize) -> String {
        self.dialect().placeholder(index)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn emit_insert_head(&self, mode: InsertMode, on_conflict: Option<&OnConflict>) -> TokenStream {
        self.dialect().emit_insert_head(mode, on_conflict)
    }

    fn emit_on_conflict(&self, on_conflict: &OnConflict) -> TokenStream {
        self.dialect().emit_on_conflict(on_conflict)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
