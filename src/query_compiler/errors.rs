use thiserror::Error;

use crate::schema_catalog::RelationResolutionError;

/// Compilation failures. Every one of them aborts the compilation; no partial
/// query is ever returned.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("Unknown entity type `{type_name}`")]
    UnknownEntityType { type_name: String },

    #[error(transparent)]
    RelationResolution(#[from] RelationResolutionError),

    #[error("Field `{field}` is not declared on entity type `{type_name}`")]
    UnknownField { type_name: String, field: String },

    #[error("Entity type `{type_name}` is referenced by a condition but is neither the root nor joined by a relation")]
    TypeNotInScope { type_name: String },

    #[error("Projection on `{type_name}` reads through relation `{relation}`, which does not join that type in this filter")]
    UnboundRelation { relation: String, type_name: String },

    #[error("Relation `{from_type}.{relation}` starts from a type that is never joined to the root")]
    DisconnectedRelation { from_type: String, relation: String },

    #[error("Invalid operand: {0}")]
    InvalidOperand(String),

    #[error("`{identifier}` is not a valid SQL identifier")]
    InvalidIdentifier { identifier: String },
}

impl CompileError {
    pub(crate) fn unknown_type(type_name: &str) -> Self {
        CompileError::UnknownEntityType {
            type_name: type_name.to_string(),
        }
    }
}
