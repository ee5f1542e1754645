//! Runs compiled queries and turns result rows back into entities.
//!
//! Rows are fetched with `SELECT DISTINCT` (joins through to-many relations
//! would otherwise repeat the root row once per match), rebuilt into a JSON
//! object keyed by logical field name, and decoded through the decoder the
//! root type registered.

pub mod backend;
mod errors;
pub mod sqlite;

use std::sync::Arc;

pub use backend::{BackendError, Row, StorageBackend};
pub use errors::MaterializeError;
pub use sqlite::{SqliteBackend, StoreError};

use crate::query_compiler::{NativeQuery, ToSql};
use crate::schema_catalog::{Entity, EntityDescriptor, EntityRegistry, FieldKind, Model, SqlValue};

pub struct Materializer<'a> {
    registry: &'a EntityRegistry,
    backend: &'a dyn StorageBackend,
}

impl<'a> Materializer<'a> {
    pub fn new(registry: &'a EntityRegistry, backend: &'a dyn StorageBackend) -> Self {
        Materializer { registry, backend }
    }

    /// Distinct root entities matching `query`, in backend order.
    pub fn execute(&self, query: &NativeQuery) -> Result<Vec<Arc<dyn Entity>>, MaterializeError> {
        let Some(descriptor) = self.registry.get(&query.root_type) else {
            log::error!(
                "Cannot materialize query rooted at unregistered type {}",
                query.root_type
            );
            return Err(MaterializeError::UnsupportedQueryShape {
                root_type: query.root_type.clone(),
            });
        };

        let query = query.distinct();
        let sql = query.to_sql();
        log::debug!("Executing: {} with {} params", sql, query.params().len());

        let rows = self
            .backend
            .query_rows(&sql, query.params())
            .map_err(|e| {
                log::error!("Query execution failed: {}", e);
                MaterializeError::execution_with_context(&sql, e)
            })?;

        let fields: Vec<(&str, FieldKind)> = query
            .selected_fields()
            .map(|name| {
                let kind = descriptor.field(name).map_or(FieldKind::Text, |f| f.kind);
                (name, kind)
            })
            .collect();

        let entities = rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| decode_row(descriptor, &fields, idx, row))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("Materialized {} {} rows", entities.len(), descriptor.name());
        Ok(entities)
    }

    /// [`execute`](Self::execute), downcast to the concrete model type.
    pub fn execute_as<T: Model>(&self, query: &NativeQuery) -> Result<Vec<T>, MaterializeError> {
        if query.root_type != T::TYPE_NAME {
            return Err(MaterializeError::TypeMismatch {
                expected: T::TYPE_NAME.to_string(),
                actual: query.root_type.clone(),
            });
        }

        self.execute(query)?
            .iter()
            .map(|entity| {
                entity
                    .downcast_ref::<T>()
                    .cloned()
                    .ok_or_else(|| MaterializeError::TypeMismatch {
                        expected: T::TYPE_NAME.to_string(),
                        actual: entity.type_name().to_string(),
                    })
            })
            .collect()
    }
}

fn decode_row(
    descriptor: &EntityDescriptor,
    fields: &[(&str, FieldKind)],
    idx: usize,
    row: Row,
) -> Result<Arc<dyn Entity>, MaterializeError> {
    if row.len() != fields.len() {
        return Err(MaterializeError::ColumnCount {
            row: idx,
            expected: fields.len(),
            actual: row.len(),
        });
    }

    let object: serde_json::Map<String, serde_json::Value> = fields
        .iter()
        .zip(row)
        .map(|((name, kind), value)| (name.to_string(), column_to_json(*kind, value)))
        .collect();

    descriptor
        .decode(serde_json::Value::Object(object))
        .map_err(|source| MaterializeError::RowDecode {
            type_name: descriptor.name().to_string(),
            source,
        })
}

/// Storage value → JSON shaped the way the model's serde impl expects.
fn column_to_json(kind: FieldKind, value: SqlValue) -> serde_json::Value {
    use serde_json::Value as Json;

    match (kind, value) {
        (_, SqlValue::Null) => Json::Null,
        (FieldKind::Bool, SqlValue::Integer(i)) => Json::Bool(i != 0),
        (_, SqlValue::Bool(b)) => Json::Bool(b),
        (_, SqlValue::Integer(i)) => Json::from(i),
        (_, SqlValue::Real(r)) => serde_json::Number::from_f64(r).map_or(Json::Null, Json::Number),
        (_, SqlValue::Uuid(u)) => Json::String(u.to_string()),
        (_, SqlValue::Text(s)) => Json::String(s),
    }
}
