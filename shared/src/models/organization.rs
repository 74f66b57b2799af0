//! Organization Model (机构)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrgStatus {
    #[default]
    Pending,
    Certified,
    Disabled,
}

/// Institution; `parent_id = None` marks the root (platform) organization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub status: OrgStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Organization {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_certified(&self) -> bool {
        self.status == OrgStatus::Certified
    }
}
