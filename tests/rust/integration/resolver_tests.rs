//! Relation resolution through an external resolver.

use authfilter::demo::Repository;
use authfilter::schema_catalog::{RelationFields, RelationResolutionError, RelationResolver};
use authfilter::query_compiler::CompileError;
use authfilter::{AdapterError, Condition, Datum, Filter, FilterAdapter, FilterRelation};
use mockall::mock;
use mockall::predicate::*;

use super::support::seeded;

mock! {
    pub Resolver {}

    impl RelationResolver for Resolver {
        fn resolve_relation_fields(
            &self,
            relation: &FilterRelation,
        ) -> Result<RelationFields, RelationResolutionError>;
    }
}

#[test]
fn test_external_resolver_supplies_join_fields() {
    let fx = seeded();
    let mut resolver = MockResolver::new();
    resolver
        .expect_resolve_relation_fields()
        .with(eq(FilterRelation::new("Repository", "Team", "OwningTeam")))
        .times(1)
        .returning(|_| {
            Ok(RelationFields {
                from_field: "TeamID".to_string(),
                to_field: "ID".to_string(),
            })
        });

    let adapter = FilterAdapter::new(&fx.registry, &fx.backend).with_resolver(&resolver);
    let filter = Filter::new("Repository")
        .join("Repository", "Team", "OwningTeam")
        .or_where(vec![Condition::eq(
            Datum::field("Team", "Name"),
            Datum::value("OtherTeam"),
        )]);

    let repos = adapter
        .authorized_resources_as::<Repository>(&filter)
        .unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].id, fx.ids.other_repo);
}

#[test]
fn test_resolver_failure_fails_compilation() {
    let fx = seeded();
    let mut resolver = MockResolver::new();
    resolver
        .expect_resolve_relation_fields()
        .times(1)
        .returning(|relation| {
            Err(RelationResolutionError::Resolver {
                from_type: relation.from_type_name.clone(),
                relation: relation.name.clone(),
                message: "mapping service unavailable".to_string(),
            })
        });

    let adapter = FilterAdapter::new(&fx.registry, &fx.backend).with_resolver(&resolver);
    let filter = Filter::new("Repository").join("Repository", "Team", "Team");

    match adapter.authorized_resources(&filter) {
        Err(AdapterError::Compile(CompileError::RelationResolution(
            RelationResolutionError::Resolver { message, .. },
        ))) => assert_eq!(message, "mapping service unavailable"),
        other => panic!("expected resolver error, got {:?}", other),
    }
}

#[test]
fn test_resolver_not_consulted_for_relation_free_filters() {
    let fx = seeded();
    let mut resolver = MockResolver::new();
    resolver.expect_resolve_relation_fields().times(0);

    let adapter = FilterAdapter::new(&fx.registry, &fx.backend).with_resolver(&resolver);
    assert_eq!(
        adapter
            .authorized_resources(&Filter::new("Repository"))
            .unwrap()
            .len(),
        2
    );
}
