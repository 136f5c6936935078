//! Website entity model
//!
//! SeaORM entity for the `websites` table: the uptime targets.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// A monitored website
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "websites")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Display name used in alerts
    pub name: String,

    #[sea_orm(unique)]
    pub url: String,

    /// Seconds between checks
    pub check_interval: i32,

    /// Inactive websites are kept for history but never checked
    pub is_active: bool,

    /// Timestamp of the most recent recorded check
    pub last_checked_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::uptime_check::Entity")]
    UptimeCheck,
    #[sea_orm(has_many = "super::alert_history::Entity")]
    AlertHistory,
}

impl Related<super::uptime_check::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UptimeCheck.def()
    }
}

impl Related<super::alert_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AlertHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
