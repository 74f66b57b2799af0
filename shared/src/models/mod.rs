//! Data models
//!
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), timestamps are Unix millis.

pub mod conflict;
pub mod notify;
pub mod order;
pub mod organization;
pub mod payment;
pub mod remark;
pub mod statistics;
pub mod student;
pub mod user;

// Re-exports
pub use conflict::*;
pub use notify::*;
pub use order::*;
pub use organization::*;
pub use payment::*;
pub use remark::*;
pub use statistics::*;
pub use student::*;
pub use user::*;

use serde::{Deserialize, Serialize};

/// One page of a list query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
}

impl<T> Page<T> {
    pub fn empty(page: u32, size: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page,
            size,
        }
    }
}
