use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::entity::{Entity, EntityType, Field, Model, Relation, SqlValue};
use super::errors::SchemaError;
use super::naming::{is_valid_identifier, NamingStrategy};

/// Decodes one row (a JSON object keyed by logical field name).
pub type DecodeFn = fn(serde_json::Value) -> Result<Arc<dyn Entity>, serde_json::Error>;

/// Extracts the identity value from an entity of the descriptor's type.
pub type IdentityFn = fn(&dyn Entity) -> Option<SqlValue>;

fn decode_model<T: Model>(row: serde_json::Value) -> Result<Arc<dyn Entity>, serde_json::Error> {
    let model: T = serde_json::from_value(row)?;
    Ok(Arc::new(model))
}

fn model_identity<T: Model>(entity: &dyn Entity) -> Option<SqlValue> {
    entity.downcast_ref::<T>().map(Model::identity)
}

/// Everything the compiler and materializer need to know about one
/// registered entity type.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    entity_type: EntityType,
    decode: DecodeFn,
    identity: IdentityFn,
}

impl EntityDescriptor {
    pub fn name(&self) -> &str {
        &self.entity_type.name
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn identity_field(&self) -> &str {
        &self.entity_type.identity_field
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.entity_type.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.entity_type.fields.iter().find(|f| f.name == name)
    }

    pub fn relations(&self) -> &[Relation] {
        &self.entity_type.relations
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.entity_type.relations.iter().find(|r| r.name == name)
    }

    pub fn decode(&self, row: serde_json::Value) -> Result<Arc<dyn Entity>, serde_json::Error> {
        (self.decode)(row)
    }

    /// Identity value of `entity`, or `None` when it is not an instance of
    /// this descriptor's type.
    pub fn identity_of(&self, entity: &dyn Entity) -> Option<SqlValue> {
        (self.identity)(entity)
    }
}

/// Entity-type name → descriptor, populated once at startup.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    types: BTreeMap<String, EntityDescriptor>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `T::TYPE_NAME`.
    ///
    /// Checks the type in isolation (identity field declared, no duplicate
    /// fields or relations). Cross-type checks happen in [`validate`].
    ///
    /// [`validate`]: EntityRegistry::validate
    pub fn register<T: Model>(&mut self) -> Result<&mut Self, SchemaError> {
        let mut entity_type = T::entity_type();
        entity_type.name = T::TYPE_NAME.to_string();
        let type_name = entity_type.name.clone();

        if self.types.contains_key(&type_name) {
            return Err(SchemaError::DuplicateEntityType { type_name });
        }

        let mut seen_fields = HashSet::new();
        for field in &entity_type.fields {
            if !seen_fields.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    type_name,
                    field: field.name.clone(),
                });
            }
        }

        if !seen_fields.contains(entity_type.identity_field.as_str()) {
            return Err(SchemaError::MissingIdentityField {
                type_name,
                field: entity_type.identity_field.clone(),
            });
        }

        let mut seen_relations = HashSet::new();
        for relation in &entity_type.relations {
            if !seen_relations.insert(relation.name.as_str()) {
                return Err(SchemaError::DuplicateRelation {
                    type_name,
                    relation: relation.name.clone(),
                });
            }
        }

        log::debug!(
            "Registered entity type {} ({} fields, {} relations)",
            type_name,
            entity_type.fields.len(),
            entity_type.relations.len()
        );

        self.types.insert(
            type_name,
            EntityDescriptor {
                entity_type,
                decode: decode_model::<T>,
                identity: model_identity::<T>,
            },
        );
        Ok(self)
    }

    /// Cross-type validation: relation targets are registered, relation
    /// fields exist on both sides, and every identifier the naming strategy
    /// derives is safe to emit unquoted.
    pub fn validate(&self, naming: &dyn NamingStrategy) -> Result<(), SchemaError> {
        for descriptor in self.types.values() {
            let table = naming.table_name(descriptor.name());
            check_identifier(&table, descriptor.name())?;
            for field in descriptor.fields() {
                check_identifier(&naming.column_name(&table, &field.name), &field.name)?;
            }

            for relation in descriptor.relations() {
                let target = self.types.get(&relation.to_type).ok_or_else(|| {
                    SchemaError::UnknownRelationTarget {
                        type_name: descriptor.name().to_string(),
                        relation: relation.name.clone(),
                        target: relation.to_type.clone(),
                    }
                })?;

                if descriptor.field(&relation.from_field).is_none() {
                    return Err(SchemaError::UnknownRelationField {
                        type_name: descriptor.name().to_string(),
                        relation: relation.name.clone(),
                        owner: descriptor.name().to_string(),
                        field: relation.from_field.clone(),
                    });
                }
                if target.field(&relation.to_field).is_none() {
                    return Err(SchemaError::UnknownRelationField {
                        type_name: descriptor.name().to_string(),
                        relation: relation.name.clone(),
                        owner: target.name().to_string(),
                        field: relation.to_field.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, type_name: &str) -> Option<&EntityDescriptor> {
        self.types.get(type_name)
    }

    pub fn descriptor(&self, type_name: &str) -> Result<&EntityDescriptor, SchemaError> {
        self.types
            .get(type_name)
            .ok_or_else(|| SchemaError::UnknownEntityType {
                type_name: type_name.to_string(),
            })
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Descriptors ordered by type name.
    pub fn iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn check_identifier(identifier: &str, source_name: &str) -> Result<(), SchemaError> {
    if is_valid_identifier(identifier) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier {
            identifier: identifier.to_string(),
            source_name: source_name.to_string(),
        })
    }
}
