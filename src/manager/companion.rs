//! Insert / update payloads.
//!
//! A companion records which columns a write touches. Unset fields are left
//! out of inserts and updates entirely, so the store applies its own
//! defaults (insert) or keeps the stored value (update).

use crate::value::Value;

/// One optional column value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field<T> {
    #[default]
    Absent,
    Set(T),
}

impl<T> Field<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Field::Set(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Field::Set(v) => Some(v),
            Field::Absent => None,
        }
    }
}

impl<T: Clone + Into<Value>> Field<T> {
    /// `(column, value)` when set.
    pub fn entry(&self, column: &'static str) -> Option<(&'static str, Value)> {
        self.as_set().map(|v| (column, v.clone().into()))
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Field::Set(value)
    }
}

/// Insert / update payload of a table.
pub trait Companion: Default + Clone + Send + Sync + 'static {
    /// Set columns in declaration order.
    fn entries(&self) -> Vec<(&'static str, Value)>;

    fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
