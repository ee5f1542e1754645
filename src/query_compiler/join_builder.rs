//! INNER JOIN construction and the table scope the joins build up.
//!
//! The root table is bound under its own name. Each relation binds its target
//! table, under its own name when that name is still free and under
//! `<table>_<relation column>` otherwise (self-joins, repeated joins).

use crate::filter::FilterRelation;
use crate::schema_catalog::naming::is_valid_identifier;
use crate::schema_catalog::{EntityRegistry, NamingStrategy, RelationResolver};

use super::errors::CompileError;
use super::native_query::{ColumnRef, Join};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Binding {
    pub type_name: String,
    pub table_name: String,
    pub alias: String,
    /// Relation that introduced this binding; `None` for the root
    pub relation: Option<String>,
}

/// Tables visible to the WHERE clause, in binding order.
#[derive(Debug, Default)]
pub(super) struct TableScope {
    bindings: Vec<Binding>,
}

impl TableScope {
    pub fn new(root_type: &str, root_table: &str) -> Self {
        TableScope {
            bindings: vec![Binding {
                type_name: root_type.to_string(),
                table_name: root_table.to_string(),
                alias: root_table.to_string(),
                relation: None,
            }],
        }
    }

    /// Earliest binding of `type_name`; for the root type this is the root.
    pub fn first_of(&self, type_name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.type_name == type_name)
    }

    /// Most recent binding of `type_name`; joins chain from here.
    pub fn latest_of(&self, type_name: &str) -> Option<&Binding> {
        self.bindings.iter().rev().find(|b| b.type_name == type_name)
    }

    /// Most recent binding introduced by `relation`.
    pub fn latest_via(&self, relation: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.relation.as_deref() == Some(relation))
    }

    fn alias_taken(&self, alias: &str) -> bool {
        self.bindings.iter().any(|b| b.alias == alias)
    }

    /// Alias for a new binding of `table_name`, `None` when the bare table
    /// name is still free.
    fn alias_for(&self, table_name: &str, relation_column: &str) -> Option<String> {
        if !self.alias_taken(table_name) {
            return None;
        }
        let base = format!("{}_{}", table_name, relation_column);
        if !self.alias_taken(&base) {
            return Some(base);
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.alias_taken(candidate))
    }

    fn bind(&mut self, binding: Binding) {
        self.bindings.push(binding);
    }
}

/// Resolves one relation and appends its binding to `scope`.
///
/// The from-side is the most recent binding of the relation's from-type;
/// callers make sure that binding exists.
pub(super) fn build_join(
    registry: &EntityRegistry,
    resolver: &dyn RelationResolver,
    naming: &dyn NamingStrategy,
    scope: &mut TableScope,
    relation: &FilterRelation,
) -> Result<Join, CompileError> {
    let from_descriptor = registry
        .get(&relation.from_type_name)
        .ok_or_else(|| CompileError::unknown_type(&relation.from_type_name))?;
    let to_descriptor = registry
        .get(&relation.to_type_name)
        .ok_or_else(|| CompileError::unknown_type(&relation.to_type_name))?;

    let fields = resolver.resolve_relation_fields(relation).map_err(|e| {
        log::warn!("Relation resolution failed: {}", e);
        e
    })?;

    if from_descriptor.field(&fields.from_field).is_none() {
        return Err(CompileError::UnknownField {
            type_name: relation.from_type_name.clone(),
            field: fields.from_field,
        });
    }
    if to_descriptor.field(&fields.to_field).is_none() {
        return Err(CompileError::UnknownField {
            type_name: relation.to_type_name.clone(),
            field: fields.to_field,
        });
    }

    let from_binding = scope
        .latest_of(&relation.from_type_name)
        .cloned()
        .ok_or_else(|| CompileError::DisconnectedRelation {
            from_type: relation.from_type_name.clone(),
            relation: relation.name.clone(),
        })?;

    let to_table = naming.table_name(&relation.to_type_name);
    let from_column = naming.column_name(&from_binding.table_name, &fields.from_field);
    let to_column = naming.column_name(&to_table, &fields.to_field);
    let relation_column = naming.column_name(&to_table, &relation.name);

    let table_alias = scope.alias_for(&to_table, &relation_column);
    for identifier in [&to_table, &from_column, &to_column]
        .into_iter()
        .chain(table_alias.as_ref())
    {
        ensure_identifier(identifier)?;
    }

    let to_alias = table_alias.clone().unwrap_or_else(|| to_table.clone());
    let join = Join {
        table_name: to_table.clone(),
        table_alias,
        left: ColumnRef::new(from_binding.alias, from_column),
        right: ColumnRef::new(to_alias.clone(), to_column),
    };

    scope.bind(Binding {
        type_name: relation.to_type_name.clone(),
        table_name: to_table,
        alias: to_alias,
        relation: Some(relation.name.clone()),
    });

    Ok(join)
}

pub(super) fn ensure_identifier(identifier: &str) -> Result<(), CompileError> {
    if is_valid_identifier(identifier) {
        Ok(())
    } else {
        Err(CompileError::InvalidIdentifier {
            identifier: identifier.to_string(),
        })
    }
}
