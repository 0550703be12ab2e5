use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account record.
///
/// Sessions, events and registrations all hang off this table. Account
/// creation and login live in the authentication collaborator; this service
/// only reads users.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub email: String,

    pub name: String,

    /// Either [`Model::ROLE_ATTENDEE`] or [`Model::ROLE_ORGANIZER`].
    pub role: String,

    /// Unix timestamp (seconds).
    pub created_at: i64,

    /// Unix timestamp (seconds).
    pub updated_at: i64,
}

impl Model {
    pub const ROLE_ATTENDEE: &'static str = "attendee";
    pub const ROLE_ORGANIZER: &'static str = "organizer";

    pub fn is_organizer(&self) -> bool {
        self.role == Self::ROLE_ORGANIZER
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
