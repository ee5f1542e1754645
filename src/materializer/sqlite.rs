//! SQLite storage backend.
//!
//! Tables are created from the registry: one table per entity type, one column
//! per declared field, identity column as primary key. Uuids are stored as
//! hyphenated text and booleans as 0/1 integers.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection};

use super::backend::{BackendError, Row, StorageBackend};
use crate::config::AdapterConfig;
use crate::schema_catalog::{
    Entity, EntityDescriptor, EntityRegistry, FieldKind, NamingStrategy, SchemaError,
    SnakeCaseNaming, SqlValue,
};
use crate::schema_catalog::naming::quote_identifier;

pub const IN_MEMORY: &str = ":memory:";

impl rusqlite::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(r) => ToSqlOutput::Owned(Value::Real(*r)),
            SqlValue::Uuid(u) => ToSqlOutput::Owned(Value::Text(u.hyphenated().to_string())),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Could not serialize `{type_name}` entity: {source}")]
    Serialize {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Field `{field}` of `{type_name}` has a value that does not fit its declared kind: {value}")]
    FieldValue {
        type_name: String,
        field: String,
        value: serde_json::Value,
    },
}

pub struct SqliteBackend {
    conn: Mutex<Connection>,
    naming: SnakeCaseNaming,
}

impl SqliteBackend {
    pub fn open(path: impl AsRef<Path>, naming: SnakeCaseNaming) -> Result<Self, BackendError> {
        let path = path.as_ref();
        log::info!("Opening SQLite database at {}", path.display());
        Ok(Self::with_connection(Connection::open(path)?, naming))
    }

    pub fn open_in_memory(naming: SnakeCaseNaming) -> Result<Self, BackendError> {
        log::debug!("Opening in-memory SQLite database");
        Ok(Self::with_connection(Connection::open_in_memory()?, naming))
    }

    pub fn from_config(config: &AdapterConfig) -> Result<Self, BackendError> {
        if config.database_path == IN_MEMORY {
            Self::open_in_memory(config.naming())
        } else {
            Self::open(&config.database_path, config.naming())
        }
    }

    pub fn with_connection(conn: Connection, naming: SnakeCaseNaming) -> Self {
        SqliteBackend {
            conn: Mutex::new(conn),
            naming,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, BackendError> {
        self.conn.lock().map_err(|_| BackendError::LockPoisoned)
    }

    /// `CREATE TABLE IF NOT EXISTS` for every registered type.
    pub fn migrate(&self, registry: &EntityRegistry) -> Result<(), StoreError> {
        registry.validate(&self.naming)?;
        let conn = self.lock()?;
        for descriptor in registry.iter() {
            let ddl = self.create_table_sql(descriptor);
            log::debug!("Migrating {}: {}", descriptor.name(), ddl);
            conn.execute(&ddl, []).map_err(BackendError::from)?;
        }
        log::info!("Migrated {} entity tables", registry.len());
        Ok(())
    }

    fn create_table_sql(&self, descriptor: &EntityDescriptor) -> String {
        let table = self.naming.table_name(descriptor.name());
        let mut columns: Vec<String> = descriptor
            .fields()
            .iter()
            .map(|field| {
                let column = self.naming.column_name(&table, &field.name);
                let not_null = if field.nullable { "" } else { " NOT NULL" };
                format!(
                    "{} {}{}",
                    quote_identifier(&column),
                    field.kind.sql_type(),
                    not_null
                )
            })
            .collect();
        columns.push(format!(
            "PRIMARY KEY ({})",
            quote_identifier(&self.naming.column_name(&table, descriptor.identity_field()))
        ));
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(&table),
            columns.join(", ")
        )
    }

    /// Insert one entity, taking column values from its serialized fields.
    pub fn insert(&self, registry: &EntityRegistry, entity: &dyn Entity) -> Result<(), StoreError> {
        let descriptor = registry.descriptor(entity.type_name())?;
        let json = entity.to_json().map_err(|source| StoreError::Serialize {
            type_name: descriptor.name().to_string(),
            source,
        })?;

        let table = self.naming.table_name(descriptor.name());
        let mut columns = Vec::with_capacity(descriptor.fields().len());
        let mut values = Vec::with_capacity(descriptor.fields().len());
        for field in descriptor.fields() {
            let raw = json.get(&field.name).cloned().unwrap_or(serde_json::Value::Null);
            let value = json_to_sql(field.kind, &raw).ok_or_else(|| StoreError::FieldValue {
                type_name: descriptor.name().to_string(),
                field: field.name.clone(),
                value: raw.clone(),
            })?;
            columns.push(quote_identifier(&self.naming.column_name(&table, &field.name)));
            values.push(value);
        }

        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&table),
            columns.join(", "),
            placeholders
        );
        log::trace!("{} with {} params", sql, values.len());

        let conn = self.lock()?;
        conn.execute(&sql, params_from_iter(values.iter()))
            .map_err(BackendError::from)?;
        Ok(())
    }
}

impl StorageBackend for SqliteBackend {
    fn naming(&self) -> &dyn NamingStrategy {
        &self.naming
    }

    fn query_rows(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, BackendError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                values.push(value_from_ref(idx, row.get_ref(idx)?)?);
            }
            out.push(values);
        }
        Ok(out)
    }
}

fn value_from_ref(column: usize, value: ValueRef<'_>) -> Result<SqlValue, BackendError> {
    match value {
        ValueRef::Null => Ok(SqlValue::Null),
        ValueRef::Integer(i) => Ok(SqlValue::Integer(i)),
        ValueRef::Real(r) => Ok(SqlValue::Real(r)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| SqlValue::Text(s.to_string()))
            .map_err(|e| BackendError::UnsupportedValue {
                column,
                message: e.to_string(),
            }),
        ValueRef::Blob(_) => Err(BackendError::UnsupportedValue {
            column,
            message: "BLOB columns are not supported".to_string(),
        }),
    }
}

/// Serialized field value → bind parameter, checked against the declared
/// kind. `None` when the value does not fit.
fn json_to_sql(kind: FieldKind, value: &serde_json::Value) -> Option<SqlValue> {
    use serde_json::Value as Json;

    match (kind, value) {
        (_, Json::Null) => Some(SqlValue::Null),
        (FieldKind::Uuid, Json::String(s)) => uuid::Uuid::parse_str(s).ok().map(SqlValue::Uuid),
        (FieldKind::Text, Json::String(s)) => Some(SqlValue::Text(s.clone())),
        (FieldKind::Integer, Json::Number(n)) => n.as_i64().map(SqlValue::Integer),
        (FieldKind::Real, Json::Number(n)) => n.as_f64().map(SqlValue::Real),
        (FieldKind::Bool, Json::Bool(b)) => Some(SqlValue::Bool(*b)),
        _ => None,
    }
}
