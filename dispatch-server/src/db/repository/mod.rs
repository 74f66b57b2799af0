//! Repository Module
//!
//! Free async functions over `&mut SqliteConnection`, so the same call works
//! on a pooled connection (`&mut *pool.acquire().await?`) or inside a
//! transaction handed out by the coordinator.

pub mod conflict;
pub mod notify;
pub mod order;
pub mod organization;
pub mod payment;
pub mod remark;
pub mod statistics;
pub mod student;

use sqlx::{QueryBuilder, Sqlite};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepoError::Duplicate(db_err.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Default/maximum page size for list queries
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 200;

/// Normalise (page, size) → (page, size, offset)
pub fn paging(page: Option<u32>, size: Option<u32>) -> (u32, u32, i64) {
    let page = page.unwrap_or(1).max(1);
    let size = size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, size, i64::from(page - 1) * i64::from(size))
}

/// Append ` AND <column> IN (?, ?, ...)` when `ids` is non-empty
pub(crate) fn push_in_filter(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, ids: &[i64]) {
    if ids.is_empty() {
        return;
    }
    qb.push(" AND ").push(column).push(" IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_defaults_and_clamps() {
        assert_eq!(paging(None, None), (1, DEFAULT_PAGE_SIZE, 0));
        assert_eq!(paging(Some(3), Some(10)), (3, 10, 20));
        assert_eq!(paging(Some(0), Some(0)), (1, 1, 0));
        assert_eq!(paging(Some(2), Some(10_000)), (2, MAX_PAGE_SIZE, 200));
    }

    #[test]
    fn in_filter_skips_empty_lists() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT 1 FROM t WHERE 1 = 1");
        push_in_filter(&mut qb, "org_id", &[]);
        assert_eq!(qb.sql(), "SELECT 1 FROM t WHERE 1 = 1");

        let ids = [1, 2, 3];
        push_in_filter(&mut qb, "org_id", &ids);
        assert_eq!(qb.sql(), "SELECT 1 FROM t WHERE 1 = 1 AND org_id IN (?, ?, ?)");
    }
}
