//! Expression AST - predicates, projections and aggregate terms.
//!
//! Values never appear inline in the token stream: [`Expr::Value`] becomes a
//! [`Token::Param`] and is bound by the executor.

use super::dialect::Dialect;
use super::query::Select;
use super::token::{Token, TokenStream};
use crate::value::Value;

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: optional_table.column
    Column { table: Option<String>, name: String },

    /// Bound value
    Value(Value),

    /// Binary operation: left op right
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// NOT (expr)
    Not(Box<Expr>),

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// IN: expr IN (values...)
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// IN subquery: expr IN (SELECT ...)
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Select>,
        negated: bool,
    },

    /// BETWEEN: expr BETWEEN low AND high
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    /// LIKE with ESCAPE: expr LIKE pattern ESCAPE escape_char
    LikeEscape {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape_char: char,
        negated: bool,
    },

    /// EXISTS (SELECT ...)
    Exists(Box<Select>),

    /// Function call: name([DISTINCT] args...)
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },

    /// Wildcard: * or table.*
    Star { table: Option<String> },

    /// Row value: (a, b, ...)
    Tuple(Vec<Expr>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // String
    Like,
}

impl BinaryOperator {
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    fn to_token(self) -> Token {
        match self {
            BinaryOperator::Eq => Token::Eq,
            BinaryOperator::Ne => Token::Ne,
            BinaryOperator::Lt => Token::Lt,
            BinaryOperator::Gt => Token::Gt,
            BinaryOperator::Lte => Token::Lte,
            BinaryOperator::Gte => Token::Gte,
            BinaryOperator::And => Token::And,
            BinaryOperator::Or => Token::Or,
            BinaryOperator::Like => Token::Like,
        }
    }
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Column of the `excluded` pseudo-table inside an upsert.
    pub fn excluded(column: &str) -> Expr {
        Expr::Column {
            table: Some("excluded".into()),
            name: column.into(),
        }
    }

    /// Collect the names of tables read by subqueries inside this expression.
    pub fn collect_tables(&self, out: &mut Vec<String>) {
        match self {
            Expr::InSubquery { expr, subquery, .. } => {
                expr.collect_tables(out);
                subquery.collect_tables(out);
            }
            Expr::Exists(select) => select.collect_tables(out),
            Expr::Binary { left, right, .. } => {
                left.collect_tables(out);
                right.collect_tables(out);
            }
            Expr::Not(inner) => inner.collect_tables(out),
            Expr::IsNull { expr, .. } => expr.collect_tables(out),
            Expr::In { expr, values, .. } => {
                expr.collect_tables(out);
                values.iter().for_each(|v| v.collect_tables(out));
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.collect_tables(out);
                low.collect_tables(out);
                high.collect_tables(out);
            }
            Expr::LikeEscape { expr, pattern, .. } => {
                expr.collect_tables(out);
                pattern.collect_tables(out);
            }
            Expr::Function { args, .. } | Expr::Tuple(args) => {
                args.iter().for_each(|a| a.collect_tables(out));
            }
            Expr::Column { .. } | Expr::Value(_) | Expr::Star { .. } => {}
        }
    }

    /// Convert this expression to a token stream.
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Column { table, name } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Ident(name.clone()));
            }

            Expr::Value(value) => {
                ts.push(Token::Param(value.clone()));
            }

            Expr::Binary { left, op, right } => {
                ts.append(&operand_tokens(left, *op));
                ts.space().push(op.to_token()).space();
                ts.append(&operand_tokens(right, *op));
            }

            Expr::Not(inner) => {
                ts.push(Token::Not).space().lparen();
                ts.append(&inner.to_tokens());
                ts.rparen();
            }

            Expr::IsNull { expr, negated } => {
                ts.append(&expr.to_tokens());
                ts.space().push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                // "x IN ()" is invalid SQL: an empty list never matches
                if values.is_empty() {
                    ts.push(if *negated { Token::True } else { Token::False });
                } else {
                    ts.append(&expr.to_tokens());
                    if *negated {
                        ts.space().push(Token::Not);
                    }
                    ts.space().push(Token::In).space().lparen();
                    ts.comma_separated(values, Expr::to_tokens);
                    ts.rparen();
                }
            }

            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                ts.append(&expr.to_tokens());
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space().push(Token::In).space().lparen();
                ts.append(&subquery.to_tokens(Dialect::Sqlite));
                ts.rparen();
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                ts.append(&expr.to_tokens());
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space().push(Token::Between).space();
                ts.append(&low.to_tokens());
                ts.space().push(Token::And).space();
                ts.append(&high.to_tokens());
            }

            Expr::LikeEscape {
                expr,
                pattern,
                escape_char,
                negated,
            } => {
                ts.append(&expr.to_tokens());
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space()
                    .push(Token::Like)
                    .space()
                    .append(&pattern.to_tokens())
                    .space()
                    .push(Token::Escape)
                    .space()
                    .push(Token::LitString(escape_char.to_string()));
            }

            Expr::Exists(select) => {
                ts.push(Token::Exists).space().lparen();
                ts.append(&select.to_tokens(Dialect::Sqlite));
                ts.rparen();
            }

            Expr::Function {
                name,
                args,
                distinct,
            } => {
                ts.push(Token::FunctionName(name.clone()));
                ts.lparen();
                if *distinct {
                    ts.push(Token::Distinct).space();
                }
                ts.comma_separated(args, Expr::to_tokens);
                ts.rparen();
            }

            Expr::Star { table } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Star);
            }

            Expr::Tuple(items) => {
                ts.lparen();
                ts.comma_separated(items, Expr::to_tokens);
                ts.rparen();
            }
        }

        ts
    }
}

/// Render one side of a binary operation, parenthesizing nested logical
/// operations whose operator differs from the parent's.
fn operand_tokens(operand: &Expr, parent: BinaryOperator) -> TokenStream {
    let needs_parens = match operand {
        Expr::Binary { op, .. } => op.is_logical() && (!parent.is_logical() || *op != parent),
        _ => false,
    };
    if needs_parens {
        let mut ts = TokenStream::new();
        ts.lparen().append(&operand.to_tokens()).rparen();
        ts
    } else {
        operand.to_tokens()
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Value(value)
    }
}

// =============================================================================
// Builder DSL
// =============================================================================

/// Unqualified column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        name: name.into(),
    }
}

/// Qualified column reference: table.column
pub fn table_col(table: &str, name: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        name: name.into(),
    }
}

/// Bound value.
pub fn value(v: impl Into<Value>) -> Expr {
    Expr::Value(v.into())
}

/// Function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
        distinct: false,
    }
}

/// COUNT(*)
pub fn count_star() -> Expr {
    func("COUNT", vec![Expr::Star { table: None }])
}

/// Unqualified `*`.
pub fn star() -> Expr {
    Expr::Star { table: None }
}

/// Extension trait for fluent expression building.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn eq(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Eq, other.into())
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Ne, other.into())
    }

    fn gt(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Gt, other.into())
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Gte, other.into())
    }

    fn lt(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Lt, other.into())
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Lte, other.into())
    }

    fn and(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::And, other.into())
    }

    fn or(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Or, other.into())
    }

    fn like(self, pattern: impl Into<Expr>) -> Expr {
        Expr::binary(self.into_expr(), BinaryOperator::Like, pattern.into())
    }

    fn not(self) -> Expr {
        Expr::Not(Box::new(self.into_expr()))
    }

    fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: false,
        }
    }

    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: true,
        }
    }

    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    fn not_in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: true,
        }
    }

    fn in_subquery(self, subquery: Select) -> Expr {
        Expr::InSubquery {
            expr: Box::new(self.into_expr()),
            subquery: Box::new(subquery),
            negated: false,
        }
    }

    fn between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> Expr {
        Expr::Between {
            expr: Box::new(self.into_expr()),
            low: Box::new(low.into()),
            high: Box::new(high.into()),
            negated: false,
        }
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}
