//! # Schema Catalog Error Types
//!
//! Errors raised while registering entity types and validating the relations
//! declared between them. All of these are startup-time problems: once a
//! registry has been built and validated it is read-only.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("Entity type `{type_name}` is already registered")]
    DuplicateEntityType { type_name: String },
    #[error("No entity type registered under `{type_name}`")]
    UnknownEntityType { type_name: String },
    #[error("Identity field `{field}` is not declared on entity type `{type_name}`")]
    MissingIdentityField { type_name: String, field: String },
    #[error("Field `{field}` is declared twice on entity type `{type_name}`")]
    DuplicateField { type_name: String, field: String },
    #[error("Relation `{relation}` is declared twice on entity type `{type_name}`")]
    DuplicateRelation { type_name: String, relation: String },
    #[error("Relation `{type_name}.{relation}` references unknown field `{field}` on `{owner}`")]
    UnknownRelationField {
        type_name: String,
        relation: String,
        owner: String,
        field: String,
    },
    #[error("Relation `{type_name}.{relation}` targets unregistered entity type `{target}`")]
    UnknownRelationTarget {
        type_name: String,
        relation: String,
        target: String,
    },
    #[error("`{identifier}` is not a valid SQL identifier (derived from `{source_name}`)")]
    InvalidIdentifier {
        identifier: String,
        source_name: String,
    },
}

