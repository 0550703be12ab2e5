use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One user's intent to attend one event.
///
/// Rows are never deleted; cancellation flips `status` so the audit trail
/// survives. "At most one active registration per (event, user)" is the
/// registration collaborator's invariant, not checked here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registrations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub event_id: String,

    pub user_id: String,

    /// Either [`Model::STATUS_REGISTERED`] or [`Model::STATUS_CANCELLED`].
    pub status: String,

    /// Unix timestamp (seconds).
    pub registered_at: i64,
}

impl Model {
    pub const STATUS_REGISTERED: &'static str = "registered";
    pub const STATUS_CANCELLED: &'static str = "cancelled";

    pub fn is_registered(&self) -> bool {
        self.status == Self::STATUS_REGISTERED
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
