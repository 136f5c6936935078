//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for each
//! table. [`DbTargetStore`](crate::store::DbTargetStore) composes them into
//! the engine's storage contract.

pub mod alert_history;
pub mod article;
pub mod feed;
pub mod uptime_check;
pub mod website;

pub use alert_history::AlertHistoryRepository;
pub use article::ArticleRepository;
pub use feed::FeedRepository;
pub use uptime_check::UptimeCheckRepository;
pub use website::WebsiteRepository;
