//! Database seeding functionality
//!
//! Creates the websites and feeds listed in configuration when they are not
//! stored yet. Existing rows are matched by URL and left untouched.

pub mod feeds;
pub mod websites;

pub use feeds::seed_feeds;
pub use websites::seed_websites;

/// How many seed entries were created versus already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub existing: usize,
}
