//! SQLite SQL dialect.
//!
//! SQLite features:
//! - ANSI identifier quoting (`"`)
//! - `?` placeholders
//! - `INSERT OR REPLACE | IGNORE | ABORT | FAIL | ROLLBACK`
//! - RETURNING (3.35+) and NULLS FIRST/LAST (3.30+)
//! - LIMIT is mandatory before OFFSET (`LIMIT -1` means unbounded)

use super::helpers;
use super::SqlDialect;
use crate::sql::dml::{InsertMode, OnConflict};
use crate::sql::token::{Token, TokenStream};

/// SQLite SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_with_sentinel(limit, offset, Some(Token::LitInt(-1)))
    }

    fn emit_insert_head(&self, mode: InsertMode, _on_conflict: Option<&OnConflict>) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Insert);
        let or = match mode {
            InsertMode::Insert => None,
            InsertMode::InsertOrReplace => Some(Token::Replace),
            InsertMode::InsertOrIgnore => Some(Token::Ignore),
            InsertMode::InsertOrAbort => Some(Token::Abort),
            InsertMode::InsertOrFail => Some(Token::Fail),
            InsertMode::InsertOrRollback => Some(Token::Rollback),
        };
        if let Some(tok) = or {
            ts.space().push(Token::Or).space().push(tok);
        }
        ts.space().push(Token::Into);
        ts
    }
}
