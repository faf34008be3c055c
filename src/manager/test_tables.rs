//! Hand-written bindings for two small tables, shaped like generated code.
//!
//! authors(id, name) <- books(id, title, pages, author_id)
//! book_tags(book_id, tag), keyed on both columns

use std::sync::Arc;

use super::companion::{Companion, Field};
use super::composer::{
    composable_builder, relation_composer, reverse_composer, ColumnFilters, ColumnOrderings,
    Composer, ComposerState,
};
use super::table::{Relation, Table};
use crate::config::Settings;
use crate::executor::{Database, SqliteExecutor};
use crate::schema::{ColumnSchema, SqlType, TableSchema};
use crate::value::{Row, RowError, Value};

pub const DDL: &str = "
CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE books (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    pages INTEGER DEFAULT 0,
    author_id INTEGER REFERENCES authors(id)
);
CREATE TABLE book_tags (
    book_id INTEGER NOT NULL,
    tag TEXT NOT NULL,
    PRIMARY KEY (book_id, tag)
);
";

pub async fn database() -> Database {
    let executor = SqliteExecutor::open_in_memory().unwrap();
    executor.execute_batch(DDL).await.unwrap();
    Database::new(Arc::new(executor), Settings::default())
}

// -----------------------------------------------------------------------------
// authors
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Authors {
    schema: Arc<TableSchema>,
    alias: Option<String>,
}

pub fn authors() -> Authors {
    let schema = TableSchema::new("authors")
        .column(ColumnSchema::new("id", SqlType::Integer).not_null())
        .column(ColumnSchema::new("name", SqlType::Text).not_null())
        .primary_key(["id"]);
    Authors {
        schema: Arc::new(schema),
        alias: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct AuthorCompanion {
    pub id: Field<i64>,
    pub name: Field<String>,
}

impl AuthorCompanion {
    pub fn name(mut self, name: &str) -> Self {
        self.name = Field::Set(name.into());
        self
    }
}

impl Companion for AuthorCompanion {
    fn entries(&self) -> Vec<(&'static str, Value)> {
        [self.id.entry("id"), self.name.entry("name")]
            .into_iter()
            .flatten()
            .collect()
    }
}

impl Table for Authors {
    type Row = Author;
    type Companion = AuthorCompanion;
    type Filters = AuthorFilters;
    type Orderings = AuthorOrderings;

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    fn with_alias(&self, alias: &str) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            alias: Some(alias.into()),
        }
    }

    fn map_row(&self, row: &Row) -> Result<Author, RowError> {
        Ok(Author {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }

    fn row_value(&self, row: &Author, column: &str) -> Option<Value> {
        match column {
            "id" => Some(row.id.into()),
            "name" => Some(row.name.clone().into()),
            _ => None,
        }
    }
}

pub struct AuthorFilters {
    state: ComposerState<Authors>,
}

impl Composer for AuthorFilters {
    type Table = Authors;

    fn new(state: ComposerState<Authors>) -> Self {
        Self { state }
    }

    fn state(&self) -> &ComposerState<Authors> {
        &self.state
    }
}

impl AuthorFilters {
    pub fn id(&self) -> ColumnFilters<i64> {
        composable_builder(&self.state, "id", ColumnFilters::new)
    }

    pub fn name(&self) -> ColumnFilters<String> {
        composable_builder(&self.state, "name", ColumnFilters::new)
    }

    pub fn books_refs<Out>(&self, f: impl FnOnce(BookFilters) -> Out) -> Out {
        reverse_composer(&self.state, &author_books(), f)
    }
}

pub struct AuthorOrderings {
    state: ComposerState<Authors>,
}

impl Composer for AuthorOrderings {
    type Table = Authors;

    fn new(state: ComposerState<Authors>) -> Self {
        Self { state }
    }

    fn state(&self) -> &ComposerState<Authors> {
        &self.state
    }
}

impl AuthorOrderings {
    pub fn id(&self) -> ColumnOrderings<i64> {
        composable_builder(&self.state, "id", ColumnOrderings::new)
    }

    pub fn name(&self) -> ColumnOrderings<String> {
        composable_builder(&self.state, "name", ColumnOrderings::new)
    }
}

// -----------------------------------------------------------------------------
// books
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Books {
    schema: Arc<TableSchema>,
    alias: Option<String>,
}

pub fn books() -> Books {
    let schema = TableSchema::new("books")
        .column(ColumnSchema::new("id", SqlType::Integer).not_null())
        .column(ColumnSchema::new("title", SqlType::Text).not_null())
        .column(ColumnSchema::new("pages", SqlType::Integer).default_value(0_i64))
        .column(ColumnSchema::new("author_id", SqlType::Integer))
        .primary_key(["id"])
        .foreign_key("author_id", "authors", "id");
    Books {
        schema: Arc::new(schema),
        alias: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub pages: Option<i64>,
    pub author_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct BookCompanion {
    pub id: Field<i64>,
    pub title: Field<String>,
    pub pages: Field<Option<i64>>,
    pub author_id: Field<Option<i64>>,
}

impl BookCompanion {
    pub fn id(mut self, id: i64) -> Self {
        self.id = Field::Set(id);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Field::Set(title.into());
        self
    }

    pub fn pages(mut self, pages: i64) -> Self {
        self.pages = Field::Set(Some(pages));
        self
    }

    pub fn author_id(mut self, author_id: i64) -> Self {
        self.author_id = Field::Set(Some(author_id));
        self
    }
}

impl Companion for BookCompanion {
    fn entries(&self) -> Vec<(&'static str, Value)> {
        [
            self.id.entry("id"),
            self.title.entry("title"),
            self.pages.entry("pages"),
            self.author_id.entry("author_id"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl Table for Books {
    type Row = Book;
    type Companion = BookCompanion;
    type Filters = BookFilters;
    type Orderings = BookOrderings;

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    fn with_alias(&self, alias: &str) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            alias: Some(alias.into()),
        }
    }

    fn map_row(&self, row: &Row) -> Result<Book, RowError> {
        Ok(Book {
            id: row.get("id")?,
            title: row.get("title")?,
            pages: row.get("pages")?,
            author_id: row.get("author_id")?,
        })
    }

    fn row_value(&self, row: &Book, column: &str) -> Option<Value> {
        match column {
            "id" => Some(row.id.into()),
            "title" => Some(row.title.clone().into()),
            "pages" => Some(row.pages.into()),
            "author_id" => Some(row.author_id.into()),
            _ => None,
        }
    }
}

pub struct BookFilters {
    state: ComposerState<Books>,
}

impl Composer for BookFilters {
    type Table = Books;

    fn new(state: ComposerState<Books>) -> Self {
        Self { state }
    }

    fn state(&self) -> &ComposerState<Books> {
        &self.state
    }
}

impl BookFilters {
    pub fn id(&self) -> ColumnFilters<i64> {
        composable_builder(&self.state, "id", ColumnFilters::new)
    }

    pub fn title(&self) -> ColumnFilters<String> {
        composable_builder(&self.state, "title", ColumnFilters::new)
    }

    pub fn pages(&self) -> ColumnFilters<i64> {
        composable_builder(&self.state, "pages", ColumnFilters::new)
    }

    pub fn author(&self) -> AuthorFilters {
        relation_composer(&self.state, &book_author())
    }
}

pub struct BookOrderings {
    state: ComposerState<Books>,
}

impl Composer for BookOrderings {
    type Table = Books;

    fn new(state: ComposerState<Books>) -> Self {
        Self { state }
    }

    fn state(&self) -> &ComposerState<Books> {
        &self.state
    }
}

impl BookOrderings {
    pub fn title(&self) -> ColumnOrderings<String> {
        composable_builder(&self.state, "title", ColumnOrderings::new)
    }

    pub fn author(&self) -> AuthorOrderings {
        relation_composer(&self.state, &book_author())
    }
}

// -----------------------------------------------------------------------------
// book_tags
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BookTags {
    schema: Arc<TableSchema>,
    alias: Option<String>,
}

pub fn book_tags() -> BookTags {
    let schema = TableSchema::new("book_tags")
        .column(ColumnSchema::new("book_id", SqlType::Integer).not_null())
        .column(ColumnSchema::new("tag", SqlType::Text).not_null())
        .primary_key(["book_id", "tag"]);
    BookTags {
        schema: Arc::new(schema),
        alias: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookTag {
    pub book_id: i64,
    pub tag: String,
}

#[derive(Debug, Clone, Default)]
pub struct BookTagCompanion {
    pub book_id: Field<i64>,
    pub tag: Field<String>,
}

impl BookTagCompanion {
    pub fn book_id(mut self, book_id: i64) -> Self {
        self.book_id = Field::Set(book_id);
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Field::Set(tag.into());
        self
    }
}

impl Companion for BookTagCompanion {
    fn entries(&self) -> Vec<(&'static str, Value)> {
        [self.book_id.entry("book_id"), self.tag.entry("tag")]
            .into_iter()
            .flatten()
            .collect()
    }
}

impl Table for BookTags {
    type Row = BookTag;
    type Companion = BookTagCompanion;
    type Filters = BookTagFilters;
    type Orderings = BookTagOrderings;

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    fn with_alias(&self, alias: &str) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            alias: Some(alias.into()),
        }
    }

    fn map_row(&self, row: &Row) -> Result<BookTag, RowError> {
        Ok(BookTag {
            book_id: row.get("book_id")?,
            tag: row.get("tag")?,
        })
    }

    fn row_value(&self, row: &BookTag, column: &str) -> Option<Value> {
        match column {
            "book_id" => Some(row.book_id.into()),
            "tag" => Some(row.tag.clone().into()),
            _ => None,
        }
    }
}

pub struct BookTagFilters {
    state: ComposerState<BookTags>,
}

impl Composer for BookTagFilters {
    type Table = BookTags;

    fn new(state: ComposerState<BookTags>) -> Self {
        Self { state }
    }

    fn state(&self) -> &ComposerState<BookTags> {
        &self.state
    }
}

impl BookTagFilters {
    pub fn tag(&self) -> ColumnFilters<String> {
        composable_builder(&self.state, "tag", ColumnFilters::new)
    }
}

pub struct BookTagOrderings {
    state: ComposerState<BookTags>,
}

impl Composer for BookTagOrderings {
    type Table = BookTags;

    fn new(state: ComposerState<BookTags>) -> Self {
        Self { state }
    }

    fn state(&self) -> &ComposerState<BookTags> {
        &self.state
    }
}

// -----------------------------------------------------------------------------
// relations
// -----------------------------------------------------------------------------

pub fn book_author() -> Relation<Books, Authors> {
    Relation::forward("author", books(), "author_id", authors(), "id")
}

pub fn author_books() -> Relation<Authors, Books> {
    Relation::reverse("books_refs", authors(), "id", books(), "author_id")
}
