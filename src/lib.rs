//! # relman
//!
//! Composable, type-aware table managers for a relational data-access layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Generated bindings (Table, Composer, Companion)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [manager]
//! ┌─────────────────────────────────────────────────────────┐
//! │   TableManager ─ filter / order_by / having / limit      │
//! │   Composers report expressions + join entries upward     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [state resolution]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Simple or joined Select, count, exists, update, delete │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [executor]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Executor trait (SQLite reference implementation)       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Builder calls never mutate: each returns a new manager over a new state,
//! so a partially built query can be branched freely. Joins implied by
//! filters on related tables are identified by their column pair and merged,
//! so the same join is never emitted twice.

pub mod config;
pub mod error;
pub mod executor;
pub mod manager;
pub mod schema;
pub mod sql;
pub mod value;

pub use config::{Settings, SettingsError};
pub use error::{ManagerError, ManagerResult};
pub use executor::{Database, Executor, ExecutorError, SqliteExecutor};
pub use manager::{ProcessedTableManager, RootTableManager, TableManager};
pub use schema::{SchemaCatalog, TableSchema};
pub use value::{Row, Value};

/// Re-exports for generated bindings and their callers.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::error::{ManagerError, ManagerResult};
    pub use crate::executor::{Database, Executor, SqliteExecutor};
    pub use crate::manager::{
        composable_builder, composer_builder, group_size, relation_composer, reverse_composer,
        Aggregate, AggregateFilter, ColumnFilters, ColumnOrderings, Companion, Composer,
        ComposerState, Field, Filter, InsertOptions, Ordering, Prefetch, ProcessedTableManager,
        ReferenceReader, Relation, RootTableManager, Table, TableManager,
    };
    pub use crate::schema::{ColumnSchema, SchemaCatalog, SqlType, TableSchema};
    pub use crate::sql::{Dialect, InsertMode, NullsOrder, OnConflict, SortDir};
    pub use crate::value::{FromValue, Row, RowError, Value};
}
