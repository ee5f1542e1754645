//! WHERE clause rendering for the OR-of-AND condition tree.
//!
//! Placeholders and parameters are produced in one left-to-right pass (lhs
//! before rhs, groups in order), so parameter `i` always belongs to the
//! `i`-th `?` in the rendered text.

use crate::filter::{Comparison, Condition, Datum, Immediate, Projection};
use crate::schema_catalog::{EntityRegistry, FieldKind, NamingStrategy, SqlValue};

use super::errors::CompileError;
use super::join_builder::{ensure_identifier, TableScope};
use super::native_query::{ColumnRef, WhereClause};

fn op_str(cmp: Comparison) -> &'static str {
    match cmp {
        Comparison::Eq => "=",
        Comparison::Neq => "!=",
        Comparison::In => "IN",
    }
}

pub(super) struct WhereBuilder<'a> {
    registry: &'a EntityRegistry,
    naming: &'a dyn NamingStrategy,
    scope: &'a TableScope,
    params: Vec<SqlValue>,
}

impl<'a> WhereBuilder<'a> {
    pub fn new(
        registry: &'a EntityRegistry,
        naming: &'a dyn NamingStrategy,
        scope: &'a TableScope,
    ) -> Self {
        WhereBuilder {
            registry,
            naming,
            scope,
            params: Vec::new(),
        }
    }

    /// Render the whole tree; `None` when no group contributes a term.
    pub fn build(mut self, groups: &[Vec<Condition>]) -> Result<Option<WhereClause>, CompileError> {
        let mut or_sqls = Vec::new();
        for group in groups {
            let mut and_sqls = Vec::with_capacity(group.len());
            for condition in group {
                and_sqls.push(self.render_condition(condition)?);
            }
            if !and_sqls.is_empty() {
                or_sqls.push(and_sqls.join(" AND "));
            }
        }

        if or_sqls.is_empty() {
            return Ok(None);
        }

        Ok(Some(WhereClause {
            sql: or_sqls.join(" OR "),
            params: self.params,
        }))
    }

    fn render_condition(&mut self, condition: &Condition) -> Result<String, CompileError> {
        // A literal is bound in the storage form of the column it is compared to.
        let lhs_kind = self.projected_kind(&condition.lhs);
        let rhs_kind = self.projected_kind(&condition.rhs);

        let lhs = self.render_side(&condition.lhs, rhs_kind)?;
        let rhs = match condition.cmp {
            Comparison::In => self.render_in_operand(&condition.rhs, lhs_kind)?,
            Comparison::Eq | Comparison::Neq => self.render_side(&condition.rhs, lhs_kind)?,
        };
        Ok(format!("{} {} {}", lhs, op_str(condition.cmp), rhs))
    }

    fn render_side(&mut self, datum: &Datum, kind: Option<FieldKind>) -> Result<String, CompileError> {
        match datum {
            Datum::Projection(projection) => Ok(self.resolve_projection(projection)?.to_string()),
            Datum::Immediate(Immediate::List(_)) => Err(CompileError::InvalidOperand(
                "a collection literal is only valid as the right-hand side of IN".to_string(),
            )),
            Datum::Immediate(immediate) => self.bind_scalar(immediate, kind),
        }
    }

    /// Right-hand side of `IN`, always parenthesised.
    fn render_in_operand(
        &mut self,
        datum: &Datum,
        kind: Option<FieldKind>,
    ) -> Result<String, CompileError> {
        match datum {
            Datum::Immediate(Immediate::List(items)) => {
                let placeholders = items
                    .iter()
                    .map(|item| self.bind_scalar(item, kind))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", placeholders.join(", ")))
            }
            other => Ok(format!("({})", self.render_side(other, kind)?)),
        }
    }

    /// Declared kind of the field a projection reads; `None` for literals and
    /// for projections that fail to resolve (reported when rendered).
    fn projected_kind(&self, datum: &Datum) -> Option<FieldKind> {
        let Datum::Projection(projection) = datum else {
            return None;
        };
        let descriptor = self.registry.get(&projection.type_name)?;
        let field = projection
            .explicit_field()
            .unwrap_or_else(|| descriptor.identity_field());
        descriptor.field(field).map(|f| f.kind)
    }

    fn bind_scalar(
        &mut self,
        immediate: &Immediate,
        kind: Option<FieldKind>,
    ) -> Result<String, CompileError> {
        let value = match immediate {
            Immediate::Value(value) => match kind {
                Some(kind) => value.clone().coerce_to(kind),
                None => value.clone(),
            },
            Immediate::Entity(entity) => {
                let descriptor = self
                    .registry
                    .get(entity.type_name())
                    .ok_or_else(|| CompileError::unknown_type(entity.type_name()))?;
                descriptor.identity_of(entity.as_ref()).ok_or_else(|| {
                    CompileError::InvalidOperand(format!(
                        "entity literal of type `{}` has no identity value",
                        entity.type_name()
                    ))
                })?
            }
            Immediate::List(_) => {
                return Err(CompileError::InvalidOperand(
                    "collection literals cannot be nested".to_string(),
                ))
            }
        };
        self.params.push(value);
        Ok("?".to_string())
    }

    fn resolve_projection(&self, projection: &Projection) -> Result<ColumnRef, CompileError> {
        let descriptor = self
            .registry
            .get(&projection.type_name)
            .ok_or_else(|| CompileError::unknown_type(&projection.type_name))?;

        let field = projection
            .explicit_field()
            .unwrap_or_else(|| descriptor.identity_field());
        if descriptor.field(field).is_none() {
            return Err(CompileError::UnknownField {
                type_name: projection.type_name.clone(),
                field: field.to_string(),
            });
        }

        let binding = match &projection.via {
            Some(relation) => self
                .scope
                .latest_via(relation)
                .filter(|b| b.type_name == projection.type_name)
                .ok_or_else(|| CompileError::UnboundRelation {
                    relation: relation.clone(),
                    type_name: projection.type_name.clone(),
                })?,
            None => self.scope.first_of(&projection.type_name).ok_or_else(|| {
                CompileError::TypeNotInScope {
                    type_name: projection.type_name.clone(),
                }
            })?,
        };

        let column = self.naming.column_name(&binding.table_name, field);
        ensure_identifier(&column)?;
        Ok(ColumnRef::new(binding.alias.clone(), column))
    }
}
