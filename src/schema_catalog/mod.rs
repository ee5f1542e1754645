//! Entity types, their registry, and how they map onto tables and columns.

pub mod entity;
pub mod errors;
pub mod naming;
pub mod registry;
pub mod relations;

// Re-export commonly used types
pub use entity::{
    Entity, EntityType, Field, FieldKind, Model, Relation, RelationKind, SqlValue,
};
pub use errors::SchemaError;
pub use naming::{ColumnConvention, NamingStrategy, SnakeCaseNaming};
pub use registry::{EntityDescriptor, EntityRegistry};
pub use relations::{RelationFields, RelationResolutionError, RelationResolver};
