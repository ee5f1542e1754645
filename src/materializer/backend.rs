//! Storage backend seam.

use thiserror::Error;

use crate::schema_catalog::{NamingStrategy, SqlValue};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection lock poisoned")]
    LockPoisoned,

    #[error("Unsupported column value in column {column}: {message}")]
    UnsupportedValue { column: usize, message: String },
}

/// One result row, values in SELECT order.
pub type Row = Vec<SqlValue>;

/// A relational store the compiled queries run against.
///
/// The backend owns the naming convention: the compiler takes identifiers
/// from [`StorageBackend::naming`] so they match the tables the backend
/// actually created.
pub trait StorageBackend: Send + Sync {
    fn naming(&self) -> &dyn NamingStrategy;

    /// Run `sql`, binding `params` to its `?` placeholders in order.
    fn query_rows(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, BackendError>;
}
