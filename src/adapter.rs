//! Data-filtering adapter: the entry point a policy engine calls with the
//! filter it derived for an actor, action and resource type.

use std::sync::Arc;

use thiserror::Error;

use crate::filter::Filter;
use crate::materializer::{MaterializeError, Materializer, StorageBackend};
use crate::query_compiler::{CompileError, FilterCompiler, NativeQuery};
use crate::schema_catalog::{Entity, EntityRegistry, Model, RelationResolver};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Filter compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error("Filter execution failed: {0}")]
    Materialize(#[from] MaterializeError),
}

pub struct FilterAdapter<'a, B: StorageBackend> {
    registry: &'a EntityRegistry,
    backend: &'a B,
    resolver: Option<&'a dyn RelationResolver>,
}

impl<'a, B: StorageBackend> FilterAdapter<'a, B> {
    pub fn new(registry: &'a EntityRegistry, backend: &'a B) -> Self {
        FilterAdapter {
            registry,
            backend,
            resolver: None,
        }
    }

    /// Resolve relations through `resolver` instead of the registry.
    pub fn with_resolver(mut self, resolver: &'a dyn RelationResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn registry(&self) -> &EntityRegistry {
        self.registry
    }

    pub fn backend(&self) -> &B {
        self.backend
    }

    fn compiler(&self) -> FilterCompiler<'_> {
        let compiler = FilterCompiler::new(self.registry, self.backend.naming());
        match self.resolver {
            Some(resolver) => compiler.with_resolver(resolver),
            None => compiler,
        }
    }

    /// Compile `filter` using the backend's naming convention.
    pub fn build_query(&self, filter: &Filter) -> Result<NativeQuery, CompileError> {
        self.compiler().compile(filter)
    }

    pub fn execute_query(
        &self,
        query: &NativeQuery,
    ) -> Result<Vec<Arc<dyn Entity>>, MaterializeError> {
        Materializer::new(self.registry, self.backend).execute(query)
    }

    /// Every root entity the filter authorizes.
    pub fn authorized_resources(
        &self,
        filter: &Filter,
    ) -> Result<Vec<Arc<dyn Entity>>, AdapterError> {
        let query = self.build_query(filter)?;
        Ok(self.execute_query(&query)?)
    }

    pub fn authorized_resources_as<T: Model>(&self, filter: &Filter) -> Result<Vec<T>, AdapterError> {
        let query = self.build_query(filter)?;
        Ok(Materializer::new(self.registry, self.backend).execute_as::<T>(&query)?)
    }
}
