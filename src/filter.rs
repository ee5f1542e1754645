//! The abstract data filter handed over by the policy evaluator.
//!
//! A [`Filter`] describes which rows of a root entity type a subject may see:
//! the relations that must be joined and an OR-of-AND tree of binary
//! [`Condition`]s. It is untrusted structured data: nothing in it is ever
//! spliced into SQL text except through the schema catalog.
//!
//! Filters can be built in code or deserialized from JSON:
//!
//! ```json
//! {
//!   "root": "User",
//!   "relations": [],
//!   "conditions": [[
//!     { "lhs": { "Projection": { "type_name": "User", "field_name": "ID" } },
//!       "cmp": "Eq",
//!       "rhs": { "Immediate": "9a4f0f7e-8a55-4d87-9c64-4c1a1f2b7c11" } }
//!   ]]
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema_catalog::{Entity, Model, SqlValue};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    /// Entity type the query starts from
    pub root: String,
    /// Relations to INNER JOIN, one join each
    #[serde(default)]
    pub relations: Vec<FilterRelation>,
    /// Disjunction of conjunctions. Empty means no restriction.
    #[serde(default)]
    pub conditions: Vec<Vec<Condition>>,
}

impl Filter {
    pub fn new(root: impl Into<String>) -> Self {
        Filter {
            root: root.into(),
            relations: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn join(
        mut self,
        from_type: impl Into<String>,
        to_type: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        self.relations
            .push(FilterRelation::new(from_type, to_type, relation));
        self
    }

    /// Add one AND-group as a new OR branch.
    pub fn or_where(mut self, group: Vec<Condition>) -> Self {
        self.conditions.push(group);
        self
    }

    /// Number of conditions across all groups.
    pub fn condition_count(&self) -> usize {
        self.conditions.iter().map(Vec::len).sum()
    }
}

/// Named relation from `from_type_name` to `to_type_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRelation {
    pub from_type_name: String,
    pub to_type_name: String,
    pub name: String,
}

impl FilterRelation {
    pub fn new(
        from_type: impl Into<String>,
        to_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        FilterRelation {
            from_type_name: from_type.into(),
            to_type_name: to_type.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Eq,
    Neq,
    In,
}

/// `lhs <cmp> rhs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub lhs: Datum,
    pub cmp: Comparison,
    pub rhs: Datum,
}

impl Condition {
    pub fn new(lhs: Datum, cmp: Comparison, rhs: Datum) -> Self {
        Condition { lhs, cmp, rhs }
    }

    pub fn eq(lhs: Datum, rhs: Datum) -> Self {
        Condition::new(lhs, Comparison::Eq, rhs)
    }

    pub fn neq(lhs: Datum, rhs: Datum) -> Self {
        Condition::new(lhs, Comparison::Neq, rhs)
    }

    pub fn is_in(lhs: Datum, rhs: Datum) -> Self {
        Condition::new(lhs, Comparison::In, rhs)
    }
}

/// One side of a condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Datum {
    Projection(Projection),
    Immediate(Immediate),
}

impl Datum {
    /// Field of an entity type; an empty field name means the identity field.
    pub fn field(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Datum::Projection(Projection::new(type_name, field_name))
    }

    /// Identity field of an entity type.
    pub fn identity(type_name: impl Into<String>) -> Self {
        Datum::Projection(Projection::identity(type_name))
    }

    pub fn value(value: impl Into<SqlValue>) -> Self {
        Datum::Immediate(Immediate::Value(value.into()))
    }

    /// A previously loaded entity; compared through its identity value.
    pub fn entity<T: Model>(entity: T) -> Self {
        Datum::Immediate(Immediate::Entity(Arc::new(entity)))
    }

    pub fn shared_entity(entity: Arc<dyn Entity>) -> Self {
        Datum::Immediate(Immediate::Entity(entity))
    }

    /// A collection literal, only valid as the right-hand side of `In`.
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Datum::Immediate(Immediate::List(
            values
                .into_iter()
                .map(|v| Immediate::Value(v.into()))
                .collect(),
        ))
    }
}

impl From<Projection> for Datum {
    fn from(projection: Projection) -> Self {
        Datum::Projection(projection)
    }
}

/// Reference to a field of a named entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub type_name: String,
    /// `None` or empty: the identity field
    #[serde(default)]
    pub field_name: Option<String>,
    /// Relation that introduced the joined table this projection reads from.
    /// Needed when the same type appears more than once (self-joins).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

impl Projection {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        let field_name = field_name.into();
        Projection {
            type_name: type_name.into(),
            field_name: (!field_name.is_empty()).then_some(field_name),
            via: None,
        }
    }

    pub fn identity(type_name: impl Into<String>) -> Self {
        Projection {
            type_name: type_name.into(),
            field_name: None,
            via: None,
        }
    }

    pub fn via(mut self, relation: impl Into<String>) -> Self {
        self.via = Some(relation.into());
        self
    }

    /// Explicit field name, if one was given.
    pub fn explicit_field(&self) -> Option<&str> {
        self.field_name.as_deref().filter(|f| !f.is_empty())
    }
}

/// A literal operand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Immediate {
    Value(SqlValue),
    List(Vec<Immediate>),
    #[serde(skip)]
    Entity(Arc<dyn Entity>),
}
