//! Users, teams arranged in a hierarchy, team memberships with a role, and
//! repositories owned by teams.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema_catalog::{EntityType, FieldKind, Model, Relation, SqlValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "ID")]
    pub id: Uuid,
    #[serde(rename = "Name")]
    pub name: String,
}

impl Model for User {
    const TYPE_NAME: &'static str = "User";

    fn entity_type() -> EntityType {
        EntityType::new(Self::TYPE_NAME)
            .field("ID", FieldKind::Uuid)
            .field("Name", FieldKind::Text)
            .relation(Relation::many("Teams", "UserTeamRole", "ID", "UserID"))
    }

    fn identity(&self) -> SqlValue {
        self.id.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(rename = "ID")]
    pub id: Uuid,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ParentID")]
    pub parent_id: Option<Uuid>,
}

impl Model for Team {
    const TYPE_NAME: &'static str = "Team";

    fn entity_type() -> EntityType {
        EntityType::new(Self::TYPE_NAME)
            .field("ID", FieldKind::Uuid)
            .field("Name", FieldKind::Text)
            .nullable_field("ParentID", FieldKind::Uuid)
            .relation(Relation::one("Parent", "Team", "ParentID", "ID"))
            .relation(Relation::many("Subteams", "Team", "ID", "ParentID"))
            .relation(Relation::many("Users", "UserTeamRole", "ID", "TeamID"))
    }

    fn identity(&self) -> SqlValue {
        self.id.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTeamRole {
    #[serde(rename = "ID")]
    pub id: Uuid,
    #[serde(rename = "UserID")]
    pub user_id: Uuid,
    #[serde(rename = "TeamID")]
    pub team_id: Uuid,
    #[serde(rename = "Role")]
    pub role: String,
}

impl Model for UserTeamRole {
    const TYPE_NAME: &'static str = "UserTeamRole";

    fn entity_type() -> EntityType {
        EntityType::new(Self::TYPE_NAME)
            .field("ID", FieldKind::Uuid)
            .field("UserID", FieldKind::Uuid)
            .field("TeamID", FieldKind::Uuid)
            .field("Role", FieldKind::Text)
            .relation(Relation::one("User", "User", "UserID", "ID"))
            .relation(Relation::one("Team", "Team", "TeamID", "ID"))
    }

    fn identity(&self) -> SqlValue {
        self.id.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(rename = "ID")]
    pub id: Uuid,
    #[serde(rename = "TeamID")]
    pub team_id: Uuid,
}

impl Model for Repository {
    const TYPE_NAME: &'static str = "Repository";

    fn entity_type() -> EntityType {
        EntityType::new(Self::TYPE_NAME)
            .field("ID", FieldKind::Uuid)
            .field("TeamID", FieldKind::Uuid)
            .relation(Relation::one("Team", "Team", "TeamID", "ID"))
    }

    fn identity(&self) -> SqlValue {
        self.id.into()
    }
}
