//! SQLite-backed executor.
//!
//! # Design
//!
//! - One connection behind an async mutex; statements run one at a time on
//!   the blocking pool
//! - Batches run inside a single transaction
//! - Every successful write broadcasts the name of the table it touched;
//!   watch streams re-run their select when a table they read changes
//! - Watch streams hold the executor weakly and end once every handle to
//!   it is dropped

use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use tokio::sync::{broadcast, Mutex};

use super::{Executor, ExecutorError, ExecutorResult, WriteResult};
use crate::config::Settings;
use crate::sql::{CompiledSql, Dialect, Select, Statement};
use crate::value::{Row, Value};

/// Capacity of the table-change channel. Slow watchers that fall further
/// behind than this re-query once instead of once per missed write.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

struct Inner {
    conn: Arc<Mutex<Connection>>,
    updates: broadcast::Sender<Arc<Vec<String>>>,
    log_statements: bool,
}

/// SQLite executor. Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct SqliteExecutor {
    inner: Arc<Inner>,
}

impl SqliteExecutor {
    /// Open or create a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> ExecutorResult<Self> {
        Ok(Self::from_connection(Connection::open(path)?, false))
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> ExecutorResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?, false))
    }

    /// Open the database described by `settings.executor`.
    pub fn from_settings(settings: &Settings) -> ExecutorResult<Self> {
        let conn = match settings.executor.resolved_path()? {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(Duration::from_millis(settings.executor.busy_timeout_ms))?;
        Ok(Self::from_connection(
            conn,
            settings.logging.log_statements,
        ))
    }

    fn from_connection(conn: Connection, log_statements: bool) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                conn: Arc::new(Mutex::new(conn)),
                updates,
                log_statements,
            }),
        }
    }

    /// Run raw SQL (DDL, fixtures). Does not notify watchers.
    pub async fn execute_batch(&self, sql: &str) -> ExecutorResult<()> {
        let sql = sql.to_string();
        self.with_connection(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
    }

    /// Run `f` against the connection on the blocking pool. The lock is
    /// held until `f` returns.
    async fn with_connection<R, F>(&self, f: F) -> ExecutorResult<R>
    where
        F: FnOnce(&mut Connection) -> ExecutorResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let mut conn = Arc::clone(&self.inner.conn).lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut *conn)).await?
    }

    fn log(&self, compiled: &CompiledSql) {
        if self.inner.log_statements {
            tracing::debug!(sql = %compiled.sql, params = ?compiled.params, "executing statement");
        }
    }

    fn notify(&self, tables: Vec<String>) {
        if tables.is_empty() {
            return;
        }
        tracing::trace!(?tables, "tables updated");
        // No receivers simply means nobody is watching
        let _ = self.inner.updates.send(Arc::new(tables));
    }

    fn prepare_write(&self, statement: &Statement) -> ExecutorResult<PendingWrite> {
        if let Statement::Select(_) = statement {
            return Err(ExecutorError::UnsupportedStatement(
                "SELECT passed to write; use get".into(),
            ));
        }

        let dialect = Dialect::Sqlite;
        let compiled = statement.compile(dialect);
        self.log(&compiled);

        Ok(PendingWrite {
            compiled,
            returns_rows: statement.returns_rows(),
            is_insert: matches!(statement, Statement::Insert(_)),
        })
    }
}

/// A compiled write, ready to hand to the blocking pool.
struct PendingWrite {
    compiled: CompiledSql,
    returns_rows: bool,
    is_insert: bool,
}

impl PendingWrite {
    fn run(&self, conn: &Connection) -> ExecutorResult<WriteResult> {
        let compiled = &self.compiled;
        let (affected, rows) = if self.returns_rows {
            let rows = query_rows(conn, compiled)?;
            (rows.len() as u64, rows)
        } else {
            let affected = conn.execute(&compiled.sql, params_from_iter(compiled.params.iter()))?;
            (affected as u64, Vec::new())
        };

        let last_insert_id = if self.is_insert && affected > 0 {
            Some(conn.last_insert_rowid())
        } else {
            None
        };

        Ok(WriteResult {
            affected,
            last_insert_id,
            rows,
        })
    }
}

#[async_trait]
impl Executor for SqliteExecutor {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn get(&self, select: &Select) -> ExecutorResult<Vec<Row>> {
        let compiled = select.compile(Dialect::Sqlite);
        self.log(&compiled);
        self.with_connection(move |conn| Ok(query_rows(conn, &compiled)?))
            .await
    }

    fn watch(&self, select: Select) -> BoxStream<'static, ExecutorResult<Vec<Row>>> {
        let state = WatchState {
            first: Some(self.clone()),
            inner: Arc::downgrade(&self.inner),
            receiver: self.inner.updates.subscribe(),
            tables: select.read_tables(),
            select,
        };

        stream::unfold(state, |mut state| async move {
            let executor = match state.first.take() {
                Some(executor) => executor,
                None => {
                    state.wait_for_change().await?;
                    SqliteExecutor {
                        inner: state.inner.upgrade()?,
                    }
                }
            };
            let rows = executor.get(&state.select).await;
            drop(executor);
            Some((rows, state))
        })
        .boxed()
    }

    async fn write(&self, statement: &Statement) -> ExecutorResult<WriteResult> {
        let pending = self.prepare_write(statement)?;
        let result = self.with_connection(move |conn| pending.run(conn)).await?;
        if result.affected > 0 {
            self.notify(statement.written_table().map(String::from).into_iter().collect());
        }
        Ok(result)
    }

    async fn batch(&self, statements: Vec<Statement>) -> ExecutorResult<Vec<WriteResult>> {
        let pending = statements
            .iter()
            .map(|statement| self.prepare_write(statement))
            .collect::<ExecutorResult<Vec<_>>>()?;

        let results = self
            .with_connection(move |conn| {
                let tx = conn.transaction()?;
                let mut results = Vec::with_capacity(pending.len());
                for write in &pending {
                    results.push(write.run(&tx)?);
                }
                tx.commit()?;
                Ok(results)
            })
            .await?;

        let mut touched: Vec<String> = Vec::new();
        for (statement, result) in statements.iter().zip(&results) {
            if let Some(table) = statement.written_table() {
                if result.affected > 0 && !touched.iter().any(|t| t == table) {
                    touched.push(table.to_string());
                }
            }
        }
        self.notify(touched);
        Ok(results)
    }
}

struct WatchState {
    /// Strong handle for the initial emission only.
    first: Option<SqliteExecutor>,
    inner: Weak<Inner>,
    receiver: broadcast::Receiver<Arc<Vec<String>>>,
    select: Select,
    tables: Vec<String>,
}

impl WatchState {
    /// Wait until a table this select reads is written. `None` once the
    /// executor is gone.
    async fn wait_for_change(&mut self) -> Option<()> {
        loop {
            match self.receiver.recv().await {
                Ok(changed) => {
                    if changed.iter().any(|t| self.tables.contains(t)) {
                        return Some(());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => return Some(()),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

fn query_rows(conn: &Connection, compiled: &CompiledSql) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(&compiled.sql)?;
    let columns: Arc<[String]> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>()
        .into();
    let width = columns.len();

    let mut rows = stmt.query(params_from_iter(compiled.params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(value_from_ref(row.get_ref(idx)?));
        }
        out.push(Row::new(Arc::clone(&columns), values));
    }
    Ok(out)
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}
