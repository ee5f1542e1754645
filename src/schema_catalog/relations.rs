//! Relation resolution: which field on each side of a named relation takes
//! part in the join.

use thiserror::Error;

use super::registry::EntityRegistry;
use crate::filter::FilterRelation;

/// Join fields of a resolved relation, as logical field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationFields {
    pub from_field: String,
    pub to_field: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RelationResolutionError {
    #[error("Relation `{from_type}.{relation}` is not declared")]
    UnknownRelation { from_type: String, relation: String },
    #[error("Relation `{from_type}.{relation}` targets `{declared}`, but the filter joins it to `{requested}`")]
    TargetMismatch {
        from_type: String,
        relation: String,
        declared: String,
        requested: String,
    },
    #[error("Could not resolve relation `{from_type}.{relation}`: {message}")]
    Resolver {
        from_type: String,
        relation: String,
        message: String,
    },
}

/// Lookup service mapping a relation descriptor to its join fields.
pub trait RelationResolver: Send + Sync {
    fn resolve_relation_fields(
        &self,
        relation: &FilterRelation,
    ) -> Result<RelationFields, RelationResolutionError>;
}

impl RelationResolver for EntityRegistry {
    fn resolve_relation_fields(
        &self,
        relation: &FilterRelation,
    ) -> Result<RelationFields, RelationResolutionError> {
        let declared = self
            .get(&relation.from_type_name)
            .and_then(|descriptor| descriptor.relation(&relation.name))
            .ok_or_else(|| RelationResolutionError::UnknownRelation {
                from_type: relation.from_type_name.clone(),
                relation: relation.name.clone(),
            })?;

        if declared.to_type != relation.to_type_name {
            return Err(RelationResolutionError::TargetMismatch {
                from_type: relation.from_type_name.clone(),
                relation: relation.name.clone(),
                declared: declared.to_type.clone(),
                requested: relation.to_type_name.clone(),
            });
        }

        Ok(RelationFields {
            from_field: declared.from_field.clone(),
            to_field: declared.to_field.clone(),
        })
    }
}
