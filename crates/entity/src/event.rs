use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Event record. Owned by exactly one organizer.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub organizer_id: String,

    pub title: String,

    pub location: Option<String>,

    /// Event start, Unix timestamp (seconds). Check-in compares this to
    /// "today" at day granularity.
    pub starts_at: i64,

    /// Unix timestamp (seconds).
    pub created_at: i64,

    /// Unix timestamp (seconds).
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
