//! Order Notify Model (订单通知)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum NotifyKind {
    Signup,
    Deposit,
    Revoke,
    Invalid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum NotifyStatus {
    #[default]
    Unread,
    Read,
}

/// Notify entity
///
/// `org_id` is the order's institution at the time the notify was written,
/// so unread counts can be scoped without joining orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderNotify {
    pub id: i64,
    pub order_id: i64,
    pub org_id: i64,
    pub kind: NotifyKind,
    pub content: String,
    pub author_id: i64,
    pub status: NotifyStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Notify search filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyQuery {
    #[serde(default)]
    pub org_ids: Vec<i64>,
    pub order_id: Option<i64>,
    pub status: Option<NotifyStatus>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}
