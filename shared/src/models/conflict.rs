//! Student Conflict Model (撞单)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ConflictStatus {
    #[default]
    Unprocessed,
    Processed,
}

/// At most one `Unprocessed` conflict exists per telephone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StudentConflict {
    pub id: i64,
    pub telephone: String,
    pub status: ConflictStatus,
    /// Number of intake records sharing the telephone
    pub total: i64,
    /// Last reporting operator
    pub author_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}
