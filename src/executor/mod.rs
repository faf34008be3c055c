//! Statement executor boundary.
//!
//! The manager runtime only ever hands structured statements to an
//! [`Executor`]; it never builds SQL text itself. [`SqliteExecutor`] is the
//! reference implementation.

mod sqlite;

pub use sqlite::SqliteExecutor;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::{Settings, SettingsError};
use crate::sql::{Dialect, Select, Statement};
use crate::value::Row;

/// Errors raised by an executor.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Settings(#[from] SettingsError),

    #[error("statement not supported by this executor: {0}")]
    UnsupportedStatement(String),

    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Outcome of a write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteResult {
    /// Rows inserted, updated or deleted.
    pub affected: u64,
    /// Row id of the last inserted row, for inserts.
    pub last_insert_id: Option<i64>,
    /// Rows produced by a RETURNING clause.
    pub rows: Vec<Row>,
}

/// Runs statements against a relational store.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Dialect statements are compiled with.
    fn dialect(&self) -> Dialect;

    /// Run a select and return every row.
    async fn get(&self, select: &Select) -> ExecutorResult<Vec<Row>>;

    /// Emit the select's rows now and again after every write to a table
    /// it reads.
    fn watch(&self, select: Select) -> BoxStream<'static, ExecutorResult<Vec<Row>>>;

    /// Run one insert, update or delete.
    async fn write(&self, statement: &Statement) -> ExecutorResult<WriteResult>;

    /// Run several writes atomically.
    async fn batch(&self, statements: Vec<Statement>) -> ExecutorResult<Vec<WriteResult>>;
}

/// Executor plus settings: the handle every manager carries.
#[derive(Clone)]
pub struct Database {
    executor: Arc<dyn Executor>,
    settings: Arc<Settings>,
}

impl Database {
    pub fn new(executor: Arc<dyn Executor>, settings: Settings) -> Self {
        Self {
            executor,
            settings: Arc::new(settings),
        }
    }

    /// SQLite database described by `settings.executor`.
    pub fn from_settings(settings: Settings) -> ExecutorResult<Self> {
        let executor = SqliteExecutor::from_settings(&settings)?;
        Ok(Self::new(Arc::new(executor), settings))
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dialect(&self) -> Dialect {
        self.executor.dialect()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("dialect", &self.dialect())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
