//! Pay Record Model (收退款记录)

use serde::{Deserialize, Serialize};

/// Charge or refund
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PayMode {
    Charge,
    Refund,
}

impl PayMode {
    /// Signed contribution of `amount` to performance
    pub const fn performance(self, amount: i64) -> i64 {
        match self {
            Self::Charge => amount,
            Self::Refund => -amount,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PayStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
}

/// Decision applied to a pending pay record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayDecision {
    Confirmed,
    Rejected,
}

impl From<PayDecision> for PayStatus {
    fn from(decision: PayDecision) -> Self {
        match decision {
            PayDecision::Confirmed => PayStatus::Confirmed,
            PayDecision::Rejected => PayStatus::Rejected,
        }
    }
}

/// Pay record entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PayRecord {
    pub id: i64,
    pub order_id: i64,
    pub mode: PayMode,
    pub title: String,
    /// Integer currency units, never negative
    pub amount: i64,
    pub status: PayStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Payment request payload (sign-up, pay, payback)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: i64,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_sign_follows_mode() {
        assert_eq!(PayMode::Charge.performance(1000), 1000);
        assert_eq!(PayMode::Refund.performance(300), -300);
    }

    #[test]
    fn decision_maps_to_status() {
        assert_eq!(PayStatus::from(PayDecision::Confirmed), PayStatus::Confirmed);
        assert_eq!(PayStatus::from(PayDecision::Rejected), PayStatus::Rejected);
    }
}
