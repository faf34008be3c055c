//! Validated set of tables plus the relation accessors derived from their
//! foreign keys.
//!
//! Accessor naming:
//!
//! - forward (`todos.category_id -> categories.id`): the foreign-key column in
//!   snake case with a trailing `_id` removed (`category`). When nothing is
//!   removed the accessor takes over the column's own name.
//! - reverse (`categories <- todos.category_id`): the referencing table in
//!   snake case followed by `_refs` (`todos_refs`).
//!
//! An accessor that collides with another accessor or with a column of the
//! same table is dropped and reported through [`SchemaCatalog::diagnostics`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use inflector::Inflector;
use serde::Deserialize;

use super::types::TableSchema;

/// Errors raised while validating a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate table: {0}")]
    DuplicateTable(String),

    #[error("table {table}: primary key column {column} does not exist")]
    UnknownPrimaryKeyColumn { table: String, column: String },

    #[error("table {table}: foreign key column {column} does not exist")]
    UnknownForeignKeyColumn { table: String, column: String },

    #[error("table {table}: foreign key {column} references unknown column {references}")]
    UnresolvedForeignKey {
        table: String,
        column: String,
        references: String,
    },

    #[error("table {table} has no relation named {accessor}")]
    UnknownRelation { table: String, accessor: String },

    #[error("relation {accessor} belongs to {expected}, not {found}")]
    TableMismatch {
        accessor: String,
        expected: String,
        found: String,
    },

    #[error("failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Direction of a relation relative to the table that owns the accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// This table holds the foreign key.
    Forward,
    /// Another table holds a foreign key pointing here.
    Reverse,
}

/// A named relation accessor on `table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationInfo {
    pub table: String,
    pub accessor: String,
    pub kind: RelationKind,
    pub local_column: String,
    pub remote_table: String,
    pub remote_column: String,
}

/// A relation accessor that was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub table: String,
    pub accessor: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.table, self.accessor, self.message)
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    tables: Vec<TableSchema>,
}

/// Validated tables and derived relations.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    tables: Vec<Arc<TableSchema>>,
    relations: Vec<RelationInfo>,
    diagnostics: Vec<Diagnostic>,
}

impl SchemaCatalog {
    pub fn new(tables: Vec<TableSchema>) -> CatalogResult<Self> {
        validate(&tables)?;
        let (relations, diagnostics) = derive_relations(&tables);
        for diagnostic in &diagnostics {
            tracing::warn!(
                table = %diagnostic.table,
                accessor = %diagnostic.accessor,
                "{}",
                diagnostic.message
            );
        }
        Ok(Self {
            tables: tables.into_iter().map(Arc::new).collect(),
            relations,
            diagnostics,
        })
    }

    /// Parse `{"tables": [...]}`.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.tables)
    }

    pub fn tables(&self) -> &[Arc<TableSchema>] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<Arc<TableSchema>> {
        self.tables.iter().find(|t| t.name == name).cloned()
    }

    pub fn relations(&self) -> &[RelationInfo] {
        &self.relations
    }

    pub fn relations_of<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a RelationInfo> {
        self.relations.iter().filter(move |r| r.table == table)
    }

    pub fn relation(&self, table: &str, accessor: &str) -> CatalogResult<&RelationInfo> {
        self.relations
            .iter()
            .find(|r| r.table == table && r.accessor == accessor)
            .ok_or_else(|| CatalogError::UnknownRelation {
                table: table.to_string(),
                accessor: accessor.to_string(),
            })
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate(tables: &[TableSchema]) -> CatalogResult<()> {
    let mut seen: HashMap<&str, &TableSchema> = HashMap::new();
    for table in tables {
        if seen.insert(table.name.as_str(), table).is_some() {
            return Err(CatalogError::DuplicateTable(table.name.clone()));
        }
    }

    for table in tables {
        if let Some(column) = table.primary_key.iter().find(|c| !table.has_column(c)) {
            return Err(CatalogError::UnknownPrimaryKeyColumn {
                table: table.name.clone(),
                column: column.clone(),
            });
        }

        for fk in &table.foreign_keys {
            if !table.has_column(&fk.column) {
                return Err(CatalogError::UnknownForeignKeyColumn {
                    table: table.name.clone(),
                    column: fk.column.clone(),
                });
            }
            let resolved = seen
                .get(fk.references_table.as_str())
                .is_some_and(|t| t.has_column(&fk.references_column));
            if !resolved {
                return Err(CatalogError::UnresolvedForeignKey {
                    table: table.name.clone(),
                    column: fk.column.clone(),
                    references: format!("{}.{}", fk.references_table, fk.references_column),
                });
            }
        }
    }

    Ok(())
}

// =============================================================================
// Accessor naming
// =============================================================================

/// Accessor name for the forward side of a foreign key column.
pub fn forward_accessor(column: &str) -> String {
    let snake = column.to_snake_case();
    match snake.strip_suffix("_id") {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => snake,
    }
}

/// Accessor name for the reverse side, on the referenced table.
pub fn reverse_accessor(referencing_table: &str) -> String {
    format!("{}_refs", referencing_table.to_snake_case())
}

fn derive_relations(tables: &[TableSchema]) -> (Vec<RelationInfo>, Vec<Diagnostic>) {
    let mut candidates: Vec<RelationInfo> = Vec::new();

    for table in tables {
        for fk in &table.foreign_keys {
            candidates.push(RelationInfo {
                table: table.name.clone(),
                accessor: forward_accessor(&fk.column),
                kind: RelationKind::Forward,
                local_column: fk.column.clone(),
                remote_table: fk.references_table.clone(),
                remote_column: fk.references_column.clone(),
            });
        }
    }

    for table in tables {
        for fk in &table.foreign_keys {
            candidates.push(RelationInfo {
                table: fk.references_table.clone(),
                accessor: reverse_accessor(&table.name),
                kind: RelationKind::Reverse,
                local_column: fk.references_column.clone(),
                remote_table: table.name.clone(),
                remote_column: fk.column.clone(),
            });
        }
    }

    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for rel in &candidates {
        *counts
            .entry((rel.table.as_str(), rel.accessor.as_str()))
            .or_default() += 1;
    }

    let mut diagnostics = Vec::new();
    let mut keep = Vec::with_capacity(candidates.len());

    for rel in &candidates {
        let duplicated = counts
            .get(&(rel.table.as_str(), rel.accessor.as_str()))
            .is_some_and(|n| *n > 1);
        let shadows_column = tables
            .iter()
            .find(|t| t.name == rel.table)
            .is_some_and(|t| {
                t.has_column(&rel.accessor)
                    && !(rel.kind == RelationKind::Forward && rel.local_column == rel.accessor)
            });

        let message = if duplicated {
            Some(format!(
                "accessor is generated by more than one relation ({} -> {}.{}); dropped",
                rel.local_column, rel.remote_table, rel.remote_column
            ))
        } else if shadows_column {
            Some(format!(
                "accessor collides with a column of {}; dropped",
                rel.table
            ))
        } else {
            None
        };

        match message {
            Some(message) => diagnostics.push(Diagnostic {
                table: rel.table.clone(),
                accessor: rel.accessor.clone(),
                message,
            }),
            None => keep.push(rel.clone()),
        }
    }

    (keep, diagnostics)
}
