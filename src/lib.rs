//! Authfilter - data filtering adapter for authorization policies
//!
//! A policy engine describes the rows an actor may access as a [`filter::Filter`]:
//! a root entity type, the relations to traverse, and an OR-of-AND condition
//! tree. This crate turns such filters into:
//! - Parameterized SQL against the tables that store the entities
//! - Typed entities decoded from the matching rows

pub mod adapter;
pub mod config;
pub mod demo;
pub mod filter;
pub mod materializer;
pub mod query_compiler;
pub mod schema_catalog;

pub use adapter::{AdapterError, FilterAdapter};
pub use filter::{Comparison, Condition, Datum, Filter, FilterRelation, Immediate, Projection};
