//! File-backed databases, configured naming and JSON filters.

use authfilter::config::{AdapterConfig, CliConfig};
use authfilter::demo::{self, Team};
use authfilter::materializer::SqliteBackend;
use authfilter::query_compiler::ToSql;
use authfilter::schema_catalog::{ColumnConvention, Entity, SnakeCaseNaming};
use authfilter::{Condition, Datum, Filter, FilterAdapter, Projection};
use test_case::test_case;

use super::support::seeded_with;

fn file_config(dir: &tempfile::TempDir) -> AdapterConfig {
    AdapterConfig::from_cli(CliConfig {
        database_path: dir.path().join("authz.db").to_string_lossy().into_owned(),
        table_prefix: "authz_".to_string(),
        singular_tables: false,
        column_convention: ColumnConvention::SnakeCase,
        log_filter: "warn".to_string(),
    })
    .unwrap()
}

#[test]
fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir);
    let registry = demo::registry().unwrap();

    let ids = {
        let backend = SqliteBackend::from_config(&config).unwrap();
        backend.migrate(&registry).unwrap();
        demo::seed(&backend, &registry).unwrap()
    };

    let backend = SqliteBackend::from_config(&config).unwrap();
    backend.migrate(&registry).unwrap();
    let adapter = FilterAdapter::new(&registry, &backend);

    let filter = Filter::new("Team").or_where(vec![Condition::eq(
        Datum::field("Team", "ParentID"),
        Datum::value(ids.sub_team),
    )]);
    let query = adapter.build_query(&filter).unwrap();
    assert!(query.to_sql().starts_with(r#"SELECT "authz_teams"."id""#));

    let teams = adapter.authorized_resources_as::<Team>(&filter).unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].id, ids.sub_sub_team);
}

#[test_case(SnakeCaseNaming::new() ; "plural snake_case")]
#[test_case(SnakeCaseNaming::new().with_singular_tables(true) ; "singular tables")]
#[test_case(SnakeCaseNaming::new().with_column_convention(ColumnConvention::CamelCase) ; "camelCase columns")]
#[test_case(SnakeCaseNaming::new().with_table_prefix("app_") ; "prefixed tables")]
fn test_results_independent_of_naming(naming: SnakeCaseNaming) {
    let fx = seeded_with(naming);
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let filter = Filter::new("Team")
        .join("Team", "Team", "Parent")
        .or_where(vec![Condition::eq(
            Projection::identity("Team").via("Parent").into(),
            Datum::value(fx.ids.sub_team),
        )]);

    let teams = adapter.authorized_resources_as::<Team>(&filter).unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].name, "SubSub");
}

#[test]
fn test_json_filter_round_trip_through_adapter() {
    let fx = seeded_with(SnakeCaseNaming::new());
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let json = serde_json::json!({
        "root": "Repository",
        "relations": [
            {"from_type_name": "Repository", "to_type_name": "Team", "name": "Team"},
            {"from_type_name": "Team", "to_type_name": "UserTeamRole", "name": "Users"}
        ],
        "conditions": [[
            {
                "lhs": {"Projection": {"type_name": "UserTeamRole", "field_name": "UserID"}},
                "cmp": "Eq",
                "rhs": {"Immediate": fx.ids.admin.to_string()}
            },
            {
                "lhs": {"Projection": {"type_name": "UserTeamRole", "field_name": "Role"}},
                "cmp": "In",
                "rhs": {"Immediate": ["owner", "guest"]}
            }
        ]]
    });
    let filter: Filter = serde_json::from_value(json).unwrap();

    let query = adapter.build_query(&filter).unwrap();
    assert_eq!(
        query.where_sql(),
        Some(r#""user_team_roles"."user_id" = ? AND "user_team_roles"."role" IN (?, ?)"#)
    );

    let mut repos: Vec<_> = adapter
        .authorized_resources(&filter)
        .unwrap()
        .iter()
        .map(|r| r.to_json().unwrap()["ID"].as_str().unwrap().to_string())
        .collect();
    repos.sort();

    let mut expected = vec![fx.ids.root_repo.to_string(), fx.ids.other_repo.to_string()];
    expected.sort();
    assert_eq!(repos, expected);
}
