//! Filter compilation: abstract [`Filter`] in, parameterized [`NativeQuery`] out.
//!
//! 1. The root type's table becomes `FROM <table>`, and every declared field of
//!    the root type is selected.
//! 2. Each relation becomes one `INNER JOIN`. The relation resolver supplies
//!    the join fields; the naming strategy supplies every identifier.
//! 3. The condition tree becomes one WHERE clause, AND inside groups and OR
//!    between them, with every literal bound as a positional parameter.
//!
//! Compilation is pure: no I/O and no shared state, so one compiler can
//! serve concurrent callers.

mod errors;
mod join_builder;
pub mod native_query;
mod where_builder;

#[cfg(test)]
mod tests;

pub use errors::CompileError;
pub use native_query::{ColumnRef, FromTable, Join, NativeQuery, SelectItem, SelectItems, WhereClause};

use crate::filter::{Datum, Filter};
use crate::schema_catalog::{EntityRegistry, NamingStrategy, RelationResolver};

use join_builder::{build_join, ensure_identifier, TableScope};
use where_builder::WhereBuilder;

pub trait ToSql {
    fn to_sql(&self) -> String;
}

pub struct FilterCompiler<'a> {
    registry: &'a EntityRegistry,
    resolver: &'a dyn RelationResolver,
    naming: &'a dyn NamingStrategy,
}

impl<'a> FilterCompiler<'a> {
    /// Compiler resolving relations through the registry's own declarations.
    pub fn new(registry: &'a EntityRegistry, naming: &'a dyn NamingStrategy) -> Self {
        FilterCompiler {
            registry,
            resolver: registry,
            naming,
        }
    }

    /// Use an external relation resolver instead of the registry.
    pub fn with_resolver(mut self, resolver: &'a dyn RelationResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn compile(&self, filter: &Filter) -> Result<NativeQuery, CompileError> {
        self.check_types(filter)?;

        let root = self
            .registry
            .get(&filter.root)
            .ok_or_else(|| CompileError::unknown_type(&filter.root))?;
        let root_table = self.naming.table_name(&filter.root);
        ensure_identifier(&root_table)?;

        let mut select_items = Vec::with_capacity(root.fields().len());
        for field in root.fields() {
            let column = self.naming.column_name(&root_table, &field.name);
            ensure_identifier(&column)?;
            select_items.push(SelectItem {
                column: ColumnRef::new(root_table.clone(), column),
                field: field.name.clone(),
            });
        }

        let mut scope = TableScope::new(&filter.root, &root_table);
        let joins = self.build_joins(filter, &mut scope)?;
        let filters = WhereBuilder::new(self.registry, self.naming, &scope).build(&filter.conditions)?;

        let query = NativeQuery {
            root_type: filter.root.clone(),
            select: SelectItems {
                items: select_items,
                distinct: false,
            },
            from: FromTable {
                table_name: root_table,
            },
            joins,
            filters,
        };

        log::debug!(
            "Compiled filter on {} ({} joins, {} params): {}",
            query.root_type,
            query.joins.len(),
            query.params().len(),
            query.to_sql()
        );

        Ok(query)
    }

    /// Every type named anywhere in the filter must be registered.
    fn check_types(&self, filter: &Filter) -> Result<(), CompileError> {
        let relation_types = filter
            .relations
            .iter()
            .flat_map(|r| [&r.from_type_name, &r.to_type_name]);
        let projection_types = filter
            .conditions
            .iter()
            .flatten()
            .flat_map(|c| [&c.lhs, &c.rhs])
            .filter_map(|datum| match datum {
                Datum::Projection(p) => Some(&p.type_name),
                Datum::Immediate(_) => None,
            });

        std::iter::once(&filter.root)
            .chain(relation_types)
            .chain(projection_types)
            .find(|name| !self.registry.contains(name))
            .map_or(Ok(()), |name| Err(CompileError::unknown_type(name)))
    }

    /// Joins in list order. A relation whose from-type is not bound yet is
    /// deferred until it is, since joins commute; a pass that binds nothing
    /// means the relation can never connect to the root.
    fn build_joins(
        &self,
        filter: &Filter,
        scope: &mut TableScope,
    ) -> Result<Vec<Join>, CompileError> {
        let mut joins = Vec::with_capacity(filter.relations.len());
        let mut pending: Vec<_> = filter.relations.iter().collect();

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for relation in pending {
                if scope.latest_of(&relation.from_type_name).is_some() {
                    joins.push(build_join(
                        self.registry,
                        self.resolver,
                        self.naming,
                        scope,
                        relation,
                    )?);
                } else {
                    deferred.push(relation);
                }
            }

            if deferred.len() == before {
                let stuck = deferred[0];
                return Err(CompileError::DisconnectedRelation {
                    from_type: stuck.from_type_name.clone(),
                    relation: stuck.name.clone(),
                });
            }
            pending = deferred;
        }

        Ok(joins)
    }
}

/// Compile `filter` against `registry`, resolving relations through the
/// registry itself.
pub fn compile(
    filter: &Filter,
    registry: &EntityRegistry,
    naming: &dyn NamingStrategy,
) -> Result<NativeQuery, CompileError> {
    FilterCompiler::new(registry, naming).compile(filter)
}
