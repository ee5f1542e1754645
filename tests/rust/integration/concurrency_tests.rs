//! One registry, backend and compiler shared across threads.

use authfilter::demo::{Repository, Team};
use authfilter::materializer::{Materializer, SqliteBackend, StorageBackend};
use authfilter::query_compiler::{FilterCompiler, NativeQuery};
use authfilter::schema_catalog::EntityRegistry;
use authfilter::{Condition, Datum, Filter, FilterAdapter};
use uuid::Uuid;

use super::support::{seeded, sorted};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_shared_types_are_send_and_sync() {
    assert_send_sync::<SqliteBackend>();
    assert_send_sync::<EntityRegistry>();
    assert_send_sync::<NativeQuery>();
    assert_send_sync::<FilterCompiler<'static>>();
    assert_send_sync::<FilterAdapter<'static, SqliteBackend>>();
}

#[test]
fn test_concurrent_compile_and_execute() {
    let fx = seeded();
    let compiler = FilterCompiler::new(&fx.registry, fx.backend.naming());
    let materializer = Materializer::new(&fx.registry, &fx.backend);

    let team_ids = [
        fx.ids.root_team,
        fx.ids.sub_team,
        fx.ids.sub_sub_team,
        fx.ids.other_team,
    ];

    std::thread::scope(|scope| {
        let handles: Vec<_> = team_ids
            .iter()
            .map(|&team_id| {
                let compiler = &compiler;
                let materializer = &materializer;
                scope.spawn(move || {
                    let mut found = Vec::new();
                    for _ in 0..25 {
                        let filter = Filter::new("Team").or_where(vec![Condition::eq(
                            Datum::identity("Team"),
                            Datum::value(team_id),
                        )]);
                        let query = compiler.compile(&filter).unwrap();
                        let teams = materializer.execute_as::<Team>(&query).unwrap();
                        assert_eq!(teams.len(), 1);
                        found.push(teams[0].id);
                    }
                    (team_id, found)
                })
            })
            .collect();

        for handle in handles {
            let (team_id, found) = handle.join().unwrap();
            assert!(found.iter().all(|id| *id == team_id));
        }
    });
}

#[test]
fn test_concurrent_adapter_calls() {
    let fx = seeded();
    let adapter = FilterAdapter::new(&fx.registry, &fx.backend);

    let cases: Vec<(Uuid, Vec<Uuid>)> = vec![
        (fx.ids.root_team, vec![fx.ids.root_repo]),
        (fx.ids.other_team, vec![fx.ids.other_repo]),
        (fx.ids.sub_team, vec![]),
    ];

    std::thread::scope(|scope| {
        for (team_id, expected) in &cases {
            let adapter = &adapter;
            scope.spawn(move || {
                let filter = Filter::new("Repository")
                    .join("Repository", "Team", "Team")
                    .or_where(vec![Condition::eq(
                        Datum::identity("Team"),
                        Datum::value(*team_id),
                    )]);
                for _ in 0..25 {
                    let repos: Vec<Uuid> = adapter
                        .authorized_resources_as::<Repository>(&filter)
                        .unwrap()
                        .into_iter()
                        .map(|r| r.id)
                        .collect();
                    assert_eq!(sorted(repos), sorted(expected.clone()));
                }
            });
        }
    });
}
