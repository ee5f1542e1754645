//! End-to-end authorization scenarios over the demo team hierarchy.

use authfilter::demo::{Repository, Team, User, UserTeamRole};
use authfilter::query_compiler::ToSql;
use authfilter::schema_catalog::Entity;
use authfilter::{AdapterError, Condition, Datum, Filter, FilterAdapter, Projection};
use uuid::Uuid;

use super::support::{seeded, sorted};

#[test]
fn test_user_by_identity() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let filter = Filter::new("User").or_where(vec![Condition::eq(
        Datum::identity("User"),
        Datum::value(fx.ids.admin),
    )]);
    let users = adapter.authorized_resources_as::<User>(&filter).unwrap();
    assert_eq!(
        users,
        vec![User {
            id: fx.ids.admin,
            name: "Admin".to_string(),
        }]
    );
}

#[test]
fn test_unknown_user_matches_nothing() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let filter = Filter::new("User").or_where(vec![Condition::eq(
        Datum::identity("User"),
        Datum::value(Uuid::new_v4()),
    )]);
    assert!(adapter.authorized_resources(&filter).unwrap().is_empty());
}

#[test]
fn test_parent_self_join_returns_only_direct_child() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let filter = Filter::new("Team")
        .join("Team", "Team", "Parent")
        .or_where(vec![Condition::eq(
            Projection::identity("Team").via("Parent").into(),
            Datum::value(fx.ids.root_team),
        )]);

    let query = adapter.build_query(&filter).unwrap();
    assert_eq!(
        query.to_sql(),
        r#"SELECT "teams"."id", "teams"."name", "teams"."parent_id" FROM "teams" INNER JOIN "teams" AS "teams_parent" ON "teams"."parent_id" = "teams_parent"."id" WHERE "teams_parent"."id" = ?"#
    );

    let teams = adapter.authorized_resources_as::<Team>(&filter).unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].name, "Sub");
    assert_eq!(teams[0].parent_id, Some(fx.ids.root_team));
}

#[test]
fn test_subteams_of_owned_teams() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    // Memberships join against the parent binding, the latest Team in scope.
    let filter = Filter::new("Team")
        .join("Team", "Team", "Parent")
        .join("Team", "UserTeamRole", "Users")
        .or_where(vec![
            Condition::eq(Datum::field("UserTeamRole", "UserID"), Datum::value(fx.ids.admin)),
            Condition::eq(Datum::field("UserTeamRole", "Role"), Datum::value("owner")),
        ]);

    let teams = adapter.authorized_resources_as::<Team>(&filter).unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].id, fx.ids.sub_sub_team);
}

#[test]
fn test_to_many_join_returns_distinct_roots() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    // The admin has three memberships; the user must come back once.
    let filter = Filter::new("User")
        .join("User", "UserTeamRole", "Teams")
        .or_where(vec![Condition::eq(
            Datum::identity("User"),
            Datum::value(fx.ids.admin),
        )]);

    let users = adapter.authorized_resources(&filter).unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].type_name(), "User");
}

#[test]
fn test_memberships_by_role() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let filter = Filter::new("UserTeamRole").or_where(vec![Condition::eq(
        Datum::field("UserTeamRole", "Role"),
        Datum::value("guest"),
    )]);

    let roles = adapter
        .authorized_resources_as::<UserTeamRole>(&filter)
        .unwrap();
    assert_eq!(
        sorted(roles.iter().map(|r| r.team_id).collect()),
        sorted(vec![fx.ids.root_team, fx.ids.other_team])
    );
    assert!(roles.iter().all(|r| r.user_id == fx.ids.admin));
}

#[test]
fn test_entity_immediate_matches_identity() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let root = Team {
        id: fx.ids.root_team,
        name: "Root".to_string(),
        parent_id: None,
    };
    let filter = Filter::new("Repository").or_where(vec![Condition::eq(
        Datum::field("Repository", "TeamID"),
        Datum::entity(root),
    )]);

    let repos = adapter
        .authorized_resources_as::<Repository>(&filter)
        .unwrap();
    assert_eq!(
        repos,
        vec![Repository {
            id: fx.ids.root_repo,
            team_id: fx.ids.root_team,
        }]
    );
}

#[test]
fn test_or_groups_union_results() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let filter = Filter::new("Team")
        .or_where(vec![Condition::eq(Datum::field("Team", "Name"), Datum::value("SubSub"))])
        .or_where(vec![Condition::eq(
            Datum::identity("Team"),
            Datum::value(fx.ids.other_team),
        )]);

    let teams = adapter.authorized_resources_as::<Team>(&filter).unwrap();
    assert_eq!(
        sorted(teams.into_iter().map(|t| t.id).collect()),
        sorted(vec![fx.ids.sub_sub_team, fx.ids.other_team])
    );
}

#[test]
fn test_in_list_and_empty_in_list() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let filter = Filter::new("Team").or_where(vec![Condition::is_in(
        Datum::identity("Team"),
        Datum::list([fx.ids.sub_team, fx.ids.sub_sub_team, Uuid::new_v4()]),
    )]);
    assert_eq!(adapter.authorized_resources(&filter).unwrap().len(), 2);

    let filter = Filter::new("Team").or_where(vec![Condition::is_in(
        Datum::identity("Team"),
        Datum::list(Vec::<Uuid>::new()),
    )]);
    assert!(adapter.authorized_resources(&filter).unwrap().is_empty());
}

#[test]
fn test_neq_excludes_matches() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let filter = Filter::new("Team").or_where(vec![Condition::neq(
        Datum::field("Team", "Name"),
        Datum::value("Root"),
    )]);
    let teams = adapter.authorized_resources_as::<Team>(&filter).unwrap();
    assert_eq!(teams.len(), 3);
    assert!(teams.iter().all(|t| t.name != "Root"));
}

#[test]
fn test_no_conditions_returns_all_rows() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    assert_eq!(adapter.authorized_resources(&Filter::new("Team")).unwrap().len(), 4);
    assert_eq!(
        adapter
            .authorized_resources(&Filter::new("Repository"))
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn test_filter_errors_never_reach_the_database() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let filter = Filter::new("Team").or_where(vec![Condition::eq(
        Datum::field("Team", "Name; DROP TABLE teams"),
        Datum::value("x"),
    )]);
    assert!(matches!(
        adapter.authorized_resources(&filter),
        Err(AdapterError::Compile(_))
    ));
    assert_eq!(adapter.authorized_resources(&Filter::new("Team")).unwrap().len(), 4);
}

#[test]
fn test_group_order_does_not_change_row_set() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let by_name = vec![Condition::eq(Datum::field("Team", "Name"), Datum::value("Root"))];
    let by_parent = vec![Condition::eq(
        Datum::field("Team", "ParentID"),
        Datum::value(fx.ids.sub_team),
    )];

    let ids_of = |filter: &Filter| {
        sorted(
            adapter
                .authorized_resources_as::<Team>(filter)
                .unwrap()
                .into_iter()
                .map(|t| t.id)
                .collect(),
        )
    };

    let forward = Filter::new("Team")
        .or_where(by_name.clone())
        .or_where(by_parent.clone());
    let reversed = Filter::new("Team").or_where(by_parent).or_where(by_name);

    assert_ne!(
        adapter.build_query(&forward).unwrap().to_sql(),
        adapter.build_query(&reversed).unwrap().to_sql()
    );
    assert_eq!(ids_of(&forward), ids_of(&reversed));
    assert_eq!(
        ids_of(&forward),
        sorted(vec![fx.ids.root_team, fx.ids.sub_sub_team])
    );
}

#[test]
fn test_text_column_matches_uuid_like_names() {
    let fx = seeded();
    let hex_name = "0123456789abcdef0123456789abcdef".to_string();
    let upper_name = Uuid::new_v4().to_string().to_uppercase();
    for name in [&hex_name, &upper_name] {
        let team = Team {
            id: Uuid::new_v4(),
            name: name.clone(),
            parent_id: None,
        };
        fx.backend.insert(&fx.registry, &team).unwrap();
    }
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    for name in [&hex_name, &upper_name] {
        let filter: Filter = serde_json::from_value(serde_json::json!({
            "root": "Team",
            "conditions": [[{
                "lhs": {"Projection": {"type_name": "Team", "field_name": "Name"}},
                "cmp": "Eq",
                "rhs": {"Immediate": name}
            }]]
        }))
        .unwrap();

        let teams = adapter.authorized_resources_as::<Team>(&filter).unwrap();
        assert_eq!(teams.len(), 1, "no single match for {}", name);
        assert_eq!(&teams[0].name, name);
    }
}

#[test]
fn test_uppercase_uuid_literal_matches_identity() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let filter: Filter = serde_json::from_value(serde_json::json!({
        "root": "Team",
        "conditions": [[{
            "lhs": {"Projection": {"type_name": "Team", "field_name": "ID"}},
            "cmp": "Eq",
            "rhs": {"Immediate": fx.ids.other_team.to_string().to_uppercase()}
        }]]
    }))
    .unwrap();

    let teams = adapter.authorized_resources_as::<Team>(&filter).unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].id, fx.ids.other_team);
}

#[test]
fn test_materialized_entity_feeds_next_filter() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let by_name = Filter::new("Team").or_where(vec![Condition::eq(
        Datum::field("Team", "Name"),
        Datum::value("OtherTeam"),
    )]);
    let teams = adapter.authorized_resources(&by_name).unwrap();
    assert_eq!(teams.len(), 1);

    let filter = Filter::new("Repository").or_where(vec![Condition::eq(
        Datum::field("Repository", "TeamID"),
        Datum::shared_entity(teams[0].clone()),
    )]);
    let repos = adapter
        .authorized_resources_as::<Repository>(&filter)
        .unwrap();
    assert_eq!(
        repos,
        vec![Repository {
            id: fx.ids.other_repo,
            team_id: fx.ids.other_team,
        }]
    );
}
