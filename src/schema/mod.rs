//! Schema provider boundary: table metadata and derived relations.

mod catalog;
mod types;

pub use catalog::{
    forward_accessor, reverse_accessor, CatalogError, CatalogResult, Diagnostic, RelationInfo,
    RelationKind, SchemaCatalog,
};
pub use types::{ColumnSchema, ForeignKeySchema, SqlType, TableSchema};
