//! Student Model (生源)

use super::conflict::StudentConflict;
use serde::{Deserialize, Serialize};

/// Intake status, decided by the duplicate lead rules
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum StudentStatus {
    /// No other record shares the telephone
    #[default]
    Fresh,
    /// Lost against an earlier record
    ConflictFailed,
    /// Holds the telephone
    ConflictSucceeded,
    /// Superseded after the challenge window
    Exceeded,
}

impl StudentStatus {
    /// Holders lose the telephone when another record wins it
    pub const fn is_holder(self) -> bool {
        matches!(self, Self::Fresh | Self::ConflictSucceeded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub telephone: String,
    /// Operator who entered the lead
    pub author_id: i64,
    pub org_id: i64,
    /// Lead source (channel); empty when unknown
    pub source: String,
    pub status: StudentStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create student payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentCreate {
    pub name: String,
    pub telephone: String,
    #[serde(default)]
    pub source: String,
}

/// Intake result: the new student and the conflict it opened or joined
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentIntake {
    pub student: Student,
    pub conflict: Option<StudentConflict>,
}
