//! Statistics Ledger Models (统计台账)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Net performance of confirmed payments
pub const KEY_ORDER: &str = "order";
/// New intake records
pub const KEY_STUDENT: &str = "student";

/// One ledger row: a dimension tuple on one business day
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StatisticsRecord {
    pub id: i64,
    pub key: String,
    pub day: NaiveDate,
    /// 0 when the dimension is not set
    pub author_id: i64,
    pub org_id: i64,
    pub publisher_id: i64,
    /// Empty when the dimension is not set
    pub source: String,
    pub value: f64,
    pub count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Dimension tuple without the day
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub key: String,
    #[serde(default)]
    pub author_id: i64,
    #[serde(default)]
    pub org_id: i64,
    #[serde(default)]
    pub publisher_id: i64,
    #[serde(default)]
    pub source: String,
}

impl Dimension {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            author_id: 0,
            org_id: 0,
            publisher_id: 0,
            source: String::new(),
        }
    }

    pub fn author(mut self, author_id: i64) -> Self {
        self.author_id = author_id;
        self
    }

    pub fn org(mut self, org_id: i64) -> Self {
        self.org_id = org_id;
        self
    }

    pub fn publisher(mut self, publisher_id: i64) -> Self {
        self.publisher_id = publisher_id;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Ledger search filter; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsFilter {
    pub key: Option<String>,
    pub author_id: Option<i64>,
    #[serde(default)]
    pub org_ids: Vec<i64>,
    pub publisher_id: Option<i64>,
    pub source: Option<String>,
    #[serde(default)]
    pub years: Vec<i32>,
    /// Inclusive
    pub from: Option<NaiveDate>,
    /// Inclusive
    pub to: Option<NaiveDate>,
}

impl StatisticsFilter {
    pub fn for_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    Day,
    /// ISO week
    Week,
    Month,
    Quarter,
    Year,
}

/// Aggregated bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsBucket {
    /// `2024-03-05`, `2024-W10`, `2024-03`, `2024-Q1` or `2024`
    pub label: String,
    pub value: f64,
    pub count: i64,
}

/// Dashboard summary, recomputed live
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub org_count: i64,
    pub student_count: i64,
    /// Confirmed charges minus confirmed refunds
    pub performance: i64,
    /// Signed-or-deposited ÷ total × 10 000
    pub success_rate: i64,
}
