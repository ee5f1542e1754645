use uuid::Uuid;

use super::models::{Repository, Team, User, UserTeamRole};
use crate::materializer::{SqliteBackend, StoreError};
use crate::schema_catalog::{Entity, EntityRegistry};

/// Identities of the seeded rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoIds {
    pub admin: Uuid,
    pub root_team: Uuid,
    pub sub_team: Uuid,
    pub sub_sub_team: Uuid,
    pub other_team: Uuid,
    pub root_repo: Uuid,
    pub other_repo: Uuid,
}

impl DemoIds {
    fn generate() -> Self {
        DemoIds {
            admin: Uuid::new_v4(),
            root_team: Uuid::new_v4(),
            sub_team: Uuid::new_v4(),
            sub_sub_team: Uuid::new_v4(),
            other_team: Uuid::new_v4(),
            root_repo: Uuid::new_v4(),
            other_repo: Uuid::new_v4(),
        }
    }
}

/// Insert the demo data set: one admin user, the Root → Sub → SubSub
/// hierarchy plus an unrelated OtherTeam, the admin's memberships (guest of
/// Root, owner of Sub, guest of OtherTeam) and one repository each for Root
/// and OtherTeam.
///
/// Tables must already exist; see [`SqliteBackend::migrate`].
pub fn seed(backend: &SqliteBackend, registry: &EntityRegistry) -> Result<DemoIds, StoreError> {
    let ids = DemoIds::generate();

    let team = |id: Uuid, name: &str, parent_id: Option<Uuid>| Team {
        id,
        name: name.to_string(),
        parent_id,
    };
    let membership = |team_id: Uuid, role: &str| UserTeamRole {
        id: Uuid::new_v4(),
        user_id: ids.admin,
        team_id,
        role: role.to_string(),
    };

    let rows: Vec<Box<dyn Entity>> = vec![
        Box::new(User {
            id: ids.admin,
            name: "Admin".to_string(),
        }),
        Box::new(team(ids.root_team, "Root", None)),
        Box::new(team(ids.sub_team, "Sub", Some(ids.root_team))),
        Box::new(team(ids.sub_sub_team, "SubSub", Some(ids.sub_team))),
        Box::new(team(ids.other_team, "OtherTeam", None)),
        Box::new(membership(ids.root_team, "guest")),
        Box::new(membership(ids.sub_team, "owner")),
        Box::new(membership(ids.other_team, "guest")),
        Box::new(Repository {
            id: ids.root_repo,
            team_id: ids.root_team,
        }),
        Box::new(Repository {
            id: ids.other_repo,
            team_id: ids.other_team,
        }),
    ];

    for row in &rows {
        backend.insert(registry, row.as_ref())?;
    }
    log::info!("Seeded {} demo rows", rows.len());

    Ok(ids)
}
