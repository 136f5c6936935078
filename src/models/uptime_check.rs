//! UptimeCheck entity model
//!
//! One check result for a website. Rows are append-only; the row with the
//! greatest id is the website's current state.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use super::website::Entity as Website;

/// Stored value of [`Model::status`] for a reachable website.
pub const STATUS_UP: &str = "up";
/// Stored value of [`Model::status`] for an unreachable website.
pub const STATUS_DOWN: &str = "down";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "uptime_checks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub website_id: i32,

    /// `up` or `down`
    pub status: String,

    pub response_time_ms: i64,

    /// HTTP status code, 0 when no response was received
    pub status_code: i32,

    pub error_message: Option<String>,

    pub checked_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_up(&self) -> bool {
        self.status == STATUS_UP
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Website",
        from = "Column::WebsiteId",
        to = "super::website::Column::Id"
    )]
    Website,
}

impl Related<Website> for Entity {
    fn to() -> RelationDef {
        Relation::Website.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
