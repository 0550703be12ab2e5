use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Check-in outcome for exactly one registration.
///
/// `registration_id` carries a unique index, so at most one row can ever
/// exist per registration; concurrent first scans resolve through the
/// insert conflict rather than through two independent creations.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub registration_id: String,

    pub present: bool,

    /// Unix timestamp (seconds).
    pub marked_at: i64,

    /// Id of the organizer who marked this record.
    pub marked_by: String,

    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
