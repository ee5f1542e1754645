//! Demo authorization model: users belong to teams with a role, teams form a
//! hierarchy, repositories are owned by teams.

mod models;
mod seed;

pub use models::{Repository, Team, User, UserTeamRole};
pub use seed::{seed, DemoIds};

use crate::schema_catalog::{EntityRegistry, SchemaError};

/// Registry with the four demo types registered.
pub fn registry() -> Result<EntityRegistry, SchemaError> {
    let mut registry = EntityRegistry::new();
    registry
        .register::<User>()?
        .register::<Team>()?
        .register::<UserTeamRole>()?
        .register::<Repository>()?;
    Ok(registry)
}
