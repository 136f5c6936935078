//! Article entity model
//!
//! Articles are unique per (feed_id, guid).

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

use super::feed::Entity as Feed;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rss_articles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub feed_id: i32,

    pub guid: String,

    pub title: String,

    pub link: String,

    pub description: Option<String>,

    pub content: Option<String>,

    pub author: Option<String>,

    /// Absent when the feed omitted the date or used an unknown format
    pub published_at: Option<DateTimeWithTimeZone>,

    pub fetched_at: DateTimeWithTimeZone,

    pub is_read: bool,

    pub is_starred: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Feed",
        from = "Column::FeedId",
        to = "super::feed::Column::Id"
    )]
    Feed,
}

impl Related<Feed> for Entity {
    fn to() -> RelationDef {
        Relation::Feed.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
