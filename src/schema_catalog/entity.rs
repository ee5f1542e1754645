//! Entity types, relations and the scalar values they carry.
//!
//! An [`EntityType`] is the static description of one row type: its logical
//! name, its identity field, its typed fields and the relations it declares to
//! other entity types. Rust types opt in by implementing [`Model`]; every
//! `Model` is usable as a type-erased [`Entity`] so the materializer can hand
//! back heterogeneous rows and the compiler can accept previously loaded rows
//! as comparison literals.

use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scalar value bound as a query parameter or read back from a column.
///
/// Deserialization never guesses a [`SqlValue::Uuid`]: JSON strings stay
/// [`SqlValue::Text`] until [`SqlValue::coerce_to`] matches them against a
/// column kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Uuid(Uuid),
    Text(String),
}

/// Accepted JSON shapes, in the order they are tried.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonScalar {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for SqlValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match JsonScalar::deserialize(deserializer)? {
            JsonScalar::Null => SqlValue::Null,
            JsonScalar::Bool(b) => SqlValue::Bool(b),
            JsonScalar::Integer(i) => SqlValue::Integer(i),
            JsonScalar::Real(r) => SqlValue::Real(r),
            JsonScalar::Text(s) => SqlValue::Text(s),
        })
    }
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Value as stored in a column of `kind`. Text compared against a uuid
    /// column is parsed so it binds in the stored (hyphenated, lowercase)
    /// form; everything else is returned unchanged.
    pub fn coerce_to(self, kind: FieldKind) -> SqlValue {
        match (kind, self) {
            (FieldKind::Uuid, SqlValue::Text(s)) => match Uuid::parse_str(&s) {
                Ok(uuid) => SqlValue::Uuid(uuid),
                Err(_) => SqlValue::Text(s),
            },
            (_, value) => value,
        }
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Integer(value.into())
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        SqlValue::Uuid(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Storage type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Uuid,
    Text,
    Integer,
    Real,
    Bool,
}

impl FieldKind {
    /// Column type used when the backend creates the table.
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Uuid | FieldKind::Text => "TEXT",
            FieldKind::Integer | FieldKind::Bool => "INTEGER",
            FieldKind::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
}

/// Cardinality tag of a relation. Informational only: both kinds compile to
/// the same INNER JOIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    One,
    Many,
}

/// Directed join path from the declaring type to `to_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub to_type: String,
    /// Field on the declaring type
    pub from_field: String,
    /// Field on `to_type`
    pub to_field: String,
}

impl Relation {
    pub fn one(
        name: impl Into<String>,
        to_type: impl Into<String>,
        from_field: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Relation {
            name: name.into(),
            kind: RelationKind::One,
            to_type: to_type.into(),
            from_field: from_field.into(),
            to_field: to_field.into(),
        }
    }

    pub fn many(
        name: impl Into<String>,
        to_type: impl Into<String>,
        from_field: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Relation {
            kind: RelationKind::Many,
            ..Relation::one(name, to_type, from_field, to_field)
        }
    }
}

/// Static description of an entity type, built once at registration.
///
/// ```ignore
/// EntityType::new("Team")
///     .field("ID", FieldKind::Uuid)
///     .field("Name", FieldKind::Text)
///     .nullable_field("ParentID", FieldKind::Uuid)
///     .relation(Relation::one("Parent", "Team", "ParentID", "ID"))
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    pub identity_field: String,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl EntityType {
    /// New entity type whose identity field defaults to `ID`.
    pub fn new(name: impl Into<String>) -> Self {
        EntityType {
            name: name.into(),
            identity_field: "ID".to_string(),
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn identity(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
            nullable: false,
        });
        self
    }

    pub fn nullable_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
            nullable: true,
        });
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }
}

/// A type-erased row.
pub trait Entity: fmt::Debug + Send + Sync + 'static {
    /// Logical entity type name this row belongs to.
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    /// Serialized form keyed by logical field name.
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;
}

impl dyn Entity {
    pub fn downcast_ref<T: Model>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// A Rust type registered as an entity type.
///
/// Serde field names must match the logical field names declared in
/// [`Model::entity_type`]; the materializer decodes rows through them.
pub trait Model:
    fmt::Debug + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const TYPE_NAME: &'static str;

    fn entity_type() -> EntityType;

    /// Value of the identity field, used when a loaded row is compared
    /// against a column.
    fn identity(&self) -> SqlValue;
}

impl<T: Model> Entity for T {
    fn type_name(&self) -> &str {
        T::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
