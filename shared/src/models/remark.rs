//! Remark Record Model

use serde::{Deserialize, Serialize};

/// Who may read a remark
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum RemarkVisibility {
    /// Written by a root-level operator, hidden from institutions
    Internal,
    /// Written by an institution operator, visible to everyone
    External,
}

/// Remark entity (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RemarkRecord {
    pub id: i64,
    pub order_id: i64,
    pub author_id: i64,
    pub visibility: RemarkVisibility,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}
