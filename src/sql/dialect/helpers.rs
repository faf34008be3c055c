//! Shared helper functions for SQL dialect implementations.

use super::super::dml::OnConflict;
use super::super::token::{Token, TokenStream};

// =============================================================================
// Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Emit LIMIT ... OFFSET ..., substituting `sentinel` as the LIMIT when only
/// an OFFSET is present (SQLite rejects a bare OFFSET).
pub fn emit_limit_offset_with_sentinel(
    limit: Option<u64>,
    offset: Option<u64>,
    sentinel: Option<Token>,
) -> TokenStream {
    let mut ts = TokenStream::new();

    let limit_token = match (limit, offset, sentinel) {
        (Some(lim), _, _) => Some(Token::LitInt(clamp(lim))),
        (None, Some(_), Some(sentinel)) => Some(sentinel),
        _ => None,
    };

    if let Some(tok) = limit_token {
        ts.push(Token::Limit).space().push(tok);
    }

    if let Some(off) = offset {
        if !ts.is_empty() {
            ts.space();
        }
        ts.push(Token::Offset).space().push(Token::LitInt(clamp(off)));
    }

    ts
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

// =============================================================================
// Conflict clauses
// =============================================================================

/// Emit `ON CONFLICT [(target)] DO NOTHING | DO UPDATE SET ...`.
pub fn emit_on_conflict_standard(on_conflict: &OnConflict) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::On).space().push(Token::Conflict);

    let target = on_conflict.target();
    if !target.is_empty() {
        ts.space().lparen();
        ts.comma_separated(target, |c| ident(c));
        ts.rparen();
    }

    ts.space().push(Token::Do).space();
    match on_conflict {
        OnConflict::DoNothing { .. } => {
            ts.push(Token::Nothing);
        }
        OnConflict::DoUpdate { set, .. } => {
            ts.push(Token::Update).space().push(Token::Set).space();
            ts.comma_separated(set, |(column, expr)| {
                let mut item = ident(column);
                item.space().push(Token::Eq).space();
                item.append(&expr.to_tokens());
                item
            });
        }
    }
    ts
}

fn ident(name: &str) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Ident(name.to_string()));
    ts
}
