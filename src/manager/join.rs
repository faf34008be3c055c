//! Join entries collected while composing filters and orderings.

use std::hash::{Hash, Hasher};

use super::table::ColumnRef;
use crate::sql::{ExprExt, Join, TableRef};

/// An equality join from a column of the current table to a column of a
/// referenced table.
///
/// Two entries are equal when their column pairs are equal. The referenced
/// table is aliased by [`join_alias`], so reaching the same relation twice
/// yields equal entries while distinct paths into the same table do not.
#[derive(Debug, Clone)]
pub struct JoinBuilder {
    current_table: TableRef,
    current_column: ColumnRef,
    referenced_table: TableRef,
    referenced_column: ColumnRef,
}

impl JoinBuilder {
    pub fn new(
        current_table: TableRef,
        current_column: ColumnRef,
        referenced_table: TableRef,
        referenced_column: ColumnRef,
    ) -> Self {
        Self {
            current_table,
            current_column,
            referenced_table,
            referenced_column,
        }
    }

    pub fn current_table(&self) -> &TableRef {
        &self.current_table
    }

    pub fn current_column(&self) -> &ColumnRef {
        &self.current_column
    }

    pub fn referenced_table(&self) -> &TableRef {
        &self.referenced_table
    }

    pub fn referenced_column(&self) -> &ColumnRef {
        &self.referenced_column
    }

    /// `LEFT OUTER JOIN referenced ON current.col = referenced.col`.
    ///
    /// Nothing from the referenced table is projected.
    pub fn build_join(&self) -> Join {
        Join::left_outer(
            self.referenced_table.clone(),
            self.current_column.expr().eq(self.referenced_column.expr()),
        )
    }
}

impl PartialEq for JoinBuilder {
    fn eq(&self, other: &Self) -> bool {
        self.current_column == other.current_column
            && self.referenced_column == other.referenced_column
    }
}

impl Eq for JoinBuilder {}

impl Hash for JoinBuilder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.current_column.hash(state);
        self.referenced_column.hash(state);
    }
}

/// Alias of a referenced table, derived from the column pair.
pub fn join_alias(current: &ColumnRef, referenced_table: &str, referenced_column: &str) -> String {
    format!(
        "{}__{}__{}__{}",
        current.table, current.name, referenced_table, referenced_column
    )
}

// =============================================================================
// JoinSet
// =============================================================================

/// Insertion-ordered set of join entries.
///
/// A join is always inserted after the joins it depends on, so iteration
/// order is a valid emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinSet {
    entries: Vec<JoinBuilder>,
}

impl JoinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an equal entry was already present.
    pub fn insert(&mut self, join: JoinBuilder) -> bool {
        if self.contains(&join) {
            return false;
        }
        self.entries.push(join);
        true
    }

    pub fn extend(&mut self, other: &JoinSet) {
        for join in &other.entries {
            self.insert(join.clone());
        }
    }

    #[must_use]
    pub fn union(mut self, other: &JoinSet) -> JoinSet {
        self.extend(other);
        self
    }

    pub fn contains(&self, join: &JoinBuilder) -> bool {
        self.entries.contains(join)
    }

    pub fn iter(&self) -> impl Iterator<Item = &JoinBuilder> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<JoinBuilder> for JoinSet {
    fn from_iter<I: IntoIterator<Item = JoinBuilder>>(iter: I) -> Self {
        let mut set = JoinSet::new();
        for join in iter {
            set.insert(join);
        }
        set
    }
}

impl<'a> IntoIterator for &'a JoinSet {
    type Item = &'a JoinBuilder;
    type IntoIter = std::slice::Iter<'a, JoinBuilder>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
