//! Two-stage GROUP BY / HAVING builder.
//!
//! Grouping expressions come first; the aggregate predicate can only be
//! attached to a [`TempGroupByBuilder`], which then seals into an immutable
//! [`GroupByBuilder`].

use crate::sql::{Expr, ExprExt, Select};

/// Grouping expressions awaiting an optional `HAVING` predicate.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "call with_having or build to finish the group-by entry"]
pub struct TempGroupByBuilder {
    expressions: Vec<Expr>,
}

impl TempGroupByBuilder {
    pub fn new(expressions: Vec<Expr>) -> Self {
        Self { expressions }
    }

    pub fn with_having(self, predicate: Expr) -> GroupByBuilder {
        GroupByBuilder {
            expressions: self.expressions,
            having: Some(predicate),
        }
    }

    pub fn build(self) -> GroupByBuilder {
        GroupByBuilder {
            expressions: self.expressions,
            having: None,
        }
    }
}

/// A finished group-by entry.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupByBuilder {
    expressions: Vec<Expr>,
    having: Option<Expr>,
}

impl GroupByBuilder {
    pub fn expressions(&self) -> &[Expr] {
        &self.expressions
    }

    pub fn having(&self) -> Option<&Expr> {
        self.having.as_ref()
    }
}

/// Apply every entry to `select`: grouping expressions are merged without
/// duplicates and HAVING predicates are ANDed.
pub fn apply_group_by(entries: &[GroupByBuilder], select: Select) -> Select {
    if entries.is_empty() {
        return select;
    }

    let mut expressions: Vec<Expr> = Vec::new();
    let mut having: Option<Expr> = None;
    for entry in entries {
        for expr in &entry.expressions {
            if !expressions.contains(expr) {
                expressions.push(expr.clone());
            }
        }
        if let Some(predicate) = &entry.having {
            having = Some(match having {
                Some(existing) => existing.and(predicate.clone()),
                None => predicate.clone(),
            });
        }
    }

    let select = select.group_by(expressions);
    match having {
        Some(predicate) => select.having(predicate),
        None => select,
    }
}
