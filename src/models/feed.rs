//! Feed entity model
//!
//! SeaORM entity for the `rss_feeds` table. Deleting a feed cascades to its
//! articles.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// An RSS or Atom feed polled for new articles
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rss_feeds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub url: String,

    /// Discovered from the feed itself when left empty on creation
    pub title: String,

    pub description: String,

    pub site_url: String,

    /// Minimum seconds between two fetches
    pub fetch_interval: i32,

    pub enabled: bool,

    pub last_fetched: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::article::Entity")]
    Article,
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
