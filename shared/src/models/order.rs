//! Dispatch Order Model (派单)

use serde::{Deserialize, Serialize};

/// Order status
///
/// `Created → Signed`, `Created → Revoked`, `Created → Invalid`.
/// `Deposited` is recognised for reporting but nothing transitions into it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrderStatus {
    #[default]
    Created,
    Signed,
    Deposited,
    Revoked,
    Invalid,
}

impl OrderStatus {
    /// Central transition table
    pub const fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Signed)
                | (Self::Created, Self::Revoked)
                | (Self::Created, Self::Invalid)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Revoked | Self::Invalid)
    }

    /// Counted as a success by the dashboard summary
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Signed | Self::Deposited)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Signed => "SIGNED",
            Self::Deposited => "DEPOSITED",
            Self::Revoked => "REVOKED",
            Self::Invalid => "INVALID",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub student_id: i64,
    /// Target institution
    pub org_id: i64,
    /// Requested subjects, in request order (JSON array)
    #[cfg_attr(feature = "db", sqlx(json))]
    pub subjects: Vec<String>,
    /// Operator who created the order
    pub publisher_id: i64,
    pub status: OrderStatus,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub student_id: i64,
    pub org_id: i64,
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// Order joined with display names (list/detail views)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderView {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub student_telephone: String,
    pub org_id: i64,
    pub org_name: String,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub subjects: Vec<String>,
    pub publisher_id: i64,
    pub publisher_name: String,
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order search filter
///
/// `org_ids` is expanded to every descendant institution before querying.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQuery {
    #[serde(default)]
    pub org_ids: Vec<i64>,
    pub status: Option<OrderStatus>,
    pub student_id: Option<i64>,
    pub publisher_id: Option<i64>,
    /// 1-based page number (default 1)
    pub page: Option<u32>,
    /// Page size (default 20, max 200)
    pub size: Option<u32>,
}

/// Result of a transition that is allowed to be a no-op
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionOutcome {
    /// The order moved to the requested status
    Applied,
    /// Nothing changed; the order was already in `current`
    NoOp { current: OrderStatus },
}
