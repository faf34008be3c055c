//! Errors raised by table managers.

use crate::executor::ExecutorError;
use crate::value::RowError;

/// Error type for manager operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("failed to map row: {0}")]
    Row(#[from] RowError),

    #[error("expected one row from {table}, found none")]
    NoRows { table: String },

    #[error("expected at most one row from {table}, found {count}")]
    TooManyRows { table: String, count: usize },

    #[error("insert into {table} did not persist a row")]
    NoRowInserted { table: String },

    #[error("nothing to write to {table}: no field is set")]
    EmptyCompanion { table: String },

    #[error("replace on {table} requires primary key column {column}")]
    MissingPrimaryKey { table: String, column: String },
}

pub type ManagerResult<T> = Result<T, ManagerError>;

impl ManagerError {
    /// True for the single-row contract failures.
    pub fn is_cardinality(&self) -> bool {
        matches!(self, Self::NoRows { .. } | Self::TooManyRows { .. })
    }
}
