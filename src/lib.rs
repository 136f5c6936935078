//! # The Ark
//!
//! Periodic website uptime checks with e-mail alerts on state changes, and
//! scheduled RSS/Atom ingestion, driven by one bounded scheduler.

pub mod alerting;
pub mod app;
pub mod checker;
pub mod config;
pub mod db;
pub mod error;
pub mod feeds;
pub mod ingest;
pub mod models;
pub mod monitor;
pub mod notifier;
pub mod repositories;
pub mod scheduler;
pub mod seeds;
pub mod stats;
pub mod store;
pub mod targets;
pub mod telemetry;
pub mod worker_pool;
pub use migration;
