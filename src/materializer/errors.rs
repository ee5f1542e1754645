use thiserror::Error;

use super::backend::BackendError;

#[derive(Debug, Error)]
pub enum MaterializeError {
    /// The compiled query's root type has no registered decoder.
    #[error("Unsupported query shape: no entity type `{root_type}` is registered to decode rows into")]
    UnsupportedQueryShape { root_type: String },

    #[error("Query execution failed: {source} (SQL: {sql})")]
    Execution {
        sql: String,
        #[source]
        source: BackendError,
    },

    #[error("Row {row} has {actual} columns, expected {expected}")]
    ColumnCount {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Could not decode `{type_name}` row: {source}")]
    RowDecode {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Decoded entity has type `{actual}`, expected `{expected}`")]
    TypeMismatch { expected: String, actual: String },
}

impl MaterializeError {
    pub fn execution_with_context(sql: &str, source: BackendError) -> Self {
        MaterializeError::Execution {
            sql: sql.to_string(),
            source,
        }
    }
}
