//! SQL Tokens - the atomic units of SQL output.
//!
//! Tokens are dialect-agnostic. A [`TokenStream`] either serializes to a
//! display string with values inlined, or compiles to a [`CompiledSql`]
//! whose values travel separately as bound parameters.

use super::dialect::{Dialect, SqlDialect};
use crate::value::Value;

/// SQL Token - every element a statement can be built from.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    Select,
    Distinct,
    From,
    Where,
    And,
    Or,
    Not,
    As,
    On,
    Join,
    Inner,
    Left,
    Outer,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    NullsFirst,
    NullsLast,
    Limit,
    Offset,
    In,
    Between,
    Like,
    Escape,
    IsNull,
    IsNotNull,
    Exists,
    True,
    False,

    // === DML Keywords ===
    Insert,
    Into,
    Values,
    Default,
    Replace,
    Ignore,
    Abort,
    Fail,
    Rollback,
    Update,
    Set,
    Delete,
    Returning,
    Conflict,
    Do,
    Nothing,

    // === Punctuation ===
    Comma,
    Dot,
    Star,
    LParen,
    RParen,

    // === Operators ===
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,

    // === Whitespace ===
    Space,

    // === Dynamic Content ===
    /// Identifier (table, column, alias).
    Ident(String),
    /// Integer literal, used for LIMIT/OFFSET.
    LitInt(i64),
    /// String literal rendered inline (escape characters).
    LitString(String),
    /// Bound value. Inlined by `serialize`, a placeholder in `compile`.
    Param(Value),
    /// Function name, rendered upper case.
    FunctionName(String),

    // === Escape Hatch ===
}

impl Token {
    /// Serialize this token for display, inlining any parameter value.
    pub fn serialize(&self, dialect: Dialect) -> String {
        match self {
            Token::Param(value) => inline_value(value, dialect),
            other => other.render(dialect),
        }
    }

    fn render(&self, dialect: Dialect) -> String {
        match self {
            Token::Select => "SELECT".into(),
            Token::Distinct => "DISTINCT".into(),
            Token::From => "FROM".into(),
            Token::Where => "WHERE".into(),
            Token::And => "AND".into(),
            Token::Or => "OR".into(),
            Token::Not => "NOT".into(),
            Token::As => "AS".into(),
            Token::On => "ON".into(),
            Token::Join => "JOIN".into(),
            Token::Inner => "INNER".into(),
            Token::Left => "LEFT".into(),
            Token::Outer => "OUTER".into(),
            Token::GroupBy => "GROUP BY".into(),
            Token::Having => "HAVING".into(),
            Token::OrderBy => "ORDER BY".into(),
            Token::Asc => "ASC".into(),
            Token::Desc => "DESC".into(),
            Token::NullsFirst => "NULLS FIRST".into(),
            Token::NullsLast => "NULLS LAST".into(),
            Token::Limit => "LIMIT".into(),
            Token::Offset => "OFFSET".into(),
            Token::In => "IN".into(),
            Token::Between => "BETWEEN".into(),
            Token::Like => "LIKE".into(),
            Token::Escape => "ESCAPE".into(),
            Token::IsNull => "IS NULL".into(),
            Token::IsNotNull => "IS NOT NULL".into(),
            Token::Exists => "EXISTS".into(),
            Token::True => dialect.format_bool(true).to_uppercase(),
            Token::False => dialect.format_bool(false).to_uppercase(),

            Token::Insert => "INSERT".into(),
            Token::Into => "INTO".into(),
            Token::Values => "VALUES".into(),
            Token::Default => "DEFAULT".into(),
            Token::Replace => "REPLACE".into(),
            Token::Ignore => "IGNORE".into(),
            Token::Abort => "ABORT".into(),
            Token::Fail => "FAIL".into(),
            Token::Rollback => "ROLLBACK".into(),
            Token::Update => "UPDATE".into(),
            Token::Set => "SET".into(),
            Token::Delete => "DELETE".into(),
            Token::Returning => "RETURNING".into(),
            Token::Conflict => "CONFLICT".into(),
            Token::Do => "DO".into(),
            Token::Nothing => "NOTHING".into(),

            Token::Comma => ",".into(),
            Token::Dot => ".".into(),
            Token::Star => "*".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),

            Token::Eq => "=".into(),
            Token::Ne => "<>".into(),
            Token::Lt => "<".into(),
            Token::Gt => ">".into(),
            Token::Lte => "<=".into(),
            Token::Gte => ">=".into(),

            Token::Space => " ".into(),

            Token::Ident(name) => dialect.quote_identifier(name),
            Token::LitInt(n) => n.to_string(),
            Token::LitString(s) => dialect.quote_string(s),
            Token::Param(value) => inline_value(value, dialect),
            Token::FunctionName(name) => name.to_uppercase(),
        }
    }
}

/// Render a value as an inline SQL literal.
fn inline_value(value: &Value, dialect: Dialect) -> String {
    match value {
        Value::Null => "NULL".into(),
        Value::Bool(b) => dialect.format_bool(*b).into(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) if f.is_finite() => {
            let mut buffer = ryu::Buffer::new();
            buffer.format(*f).to_string()
        }
        // Non-finite reals have no literal form
        Value::Real(_) => "NULL".into(),
        Value::Text(s) => dialect.quote_string(s),
        Value::Blob(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
            format!("X'{}'", hex)
        }
    }
}

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSql {
    pub sql: String,
    pub params: Vec<Value>,
}

/// A stream of tokens that can be serialized to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) -> &mut Self {
        self.tokens.extend(tokens);
        self
    }

    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Serialize to a display string with values inlined.
    pub fn serialize(&self, dialect: Dialect) -> String {
        self.tokens.iter().map(|t| t.serialize(dialect)).collect()
    }

    /// Compile to SQL text with placeholders and the ordered parameter list.
    pub fn compile(&self, dialect: Dialect) -> CompiledSql {
        let mut sql = String::new();
        let mut params = Vec::new();
        for token in &self.tokens {
            match token {
                Token::Param(value) => {
                    params.push(value.clone());
                    sql.push_str(&dialect.placeholder(params.len()));
                }
                other => sql.push_str(&other.render(dialect)),
            }
        }
        CompiledSql { sql, params }
    }

    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }

    /// Append `items` separated by `, `.
    pub fn comma_separated<I, F>(&mut self, items: I, mut render: F) -> &mut Self
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> TokenStream,
    {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.comma().space();
            }
            let rendered = render(item);
            self.append(&rendered);
        }
        self
    }
}
