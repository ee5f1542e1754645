use crate::demo;
use crate::filter::Filter;
use crate::schema_catalog::{EntityRegistry, SnakeCaseNaming};

use super::{compile, CompileError, NativeQuery};


fn registry() -> EntityRegistry {
    demo::registry().expect("demo registry")
}

fn compile_default(filter: &Filter) -> Result<NativeQuery, CompileError> {
    compile(filter, &registry(), &SnakeCaseNaming::new())
}

fn sql_of(filter: &Filter) -> String {
    use super::ToSql;
    compile_default(filter)
        .expect("filter should compile")
        .to_sql()
}
