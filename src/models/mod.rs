//! # Data Models
//!
//! SeaORM entities for websites, their checks and alerts, and feeds with their
//! articles.

pub mod alert_history;
pub mod article;
pub mod feed;
pub mod uptime_check;
pub mod website;

pub use alert_history::Entity as AlertHistory;
pub use article::Entity as Article;
pub use feed::Entity as Feed;
pub use uptime_check::Entity as UptimeCheck;
pub use website::Entity as Website;
