//! User Model

use serde::{Deserialize, Serialize};

/// Back-office account; only the name is used by the dispatch core (display joins)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub name: String,
    pub org_id: i64,
    pub role_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Already-authenticated caller identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub user_id: i64,
    pub org_id: i64,
    pub role_id: i64,
}
