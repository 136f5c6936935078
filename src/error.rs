//! # Error Handling
//!
//! Error types shared by the store, the per-target processors and the
//! scheduler. Transient target failures (unreachable website, non-200) are
//! not errors at all: they are recorded as `down` observations.

use thiserror::Error;

use crate::feeds::FetchError;
use crate::targets::TargetKey;

/// Failures raised by a [`TargetStore`](crate::store::TargetStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Failure while processing a single target. Never aborts a cycle.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("processing cancelled")]
    Cancelled,
    #[error("{0} processing is disabled")]
    Disabled(crate::targets::TargetKind),
}

/// Errors surfaced to callers of the [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler is already running")]
    AlreadyRunning,
    #[error("scheduler has been stopped")]
    Stopped,
    #[error("target {0} not found or not active")]
    TargetNotFound(TargetKey),
    #[error("{0} is disabled")]
    KindDisabled(TargetKey),
    #[error("failed to list targets: {0}")]
    Store(#[from] StoreError),
    #[error("processing {key} failed: {source}")]
    Target {
        key: TargetKey,
        #[source]
        source: ProcessError,
    },
    #[error("scheduler task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Returns true when the database rejected a write because of a unique index.
pub(crate) fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        sea_orm::DbErr::RecordNotInserted => return false,
        other => {
            // Some driver paths only keep the message text.
            let message = other.to_string();
            return message.contains("UNIQUE constraint failed");
        }
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error
        .code()
        .map(|code| {
            let code = code.as_ref();
            code == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_detected_from_message() {
        let err = sea_orm::DbErr::Custom(
            "UNIQUE constraint failed: rss_articles.feed_id, rss_articles.guid".to_string(),
        );
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn other_errors_are_not_unique_violations() {
        let err = sea_orm::DbErr::Custom("disk I/O error".to_string());
        assert!(!is_unique_violation(&err));
        assert!(!is_unique_violation(&sea_orm::DbErr::RecordNotInserted));
    }

    #[test]
    fn scheduler_error_mentions_target() {
        let key = TargetKey::website(7);
        let err = SchedulerError::TargetNotFound(key);
        assert_eq!(err.to_string(), "target website:7 not found or not active");
    }
}
