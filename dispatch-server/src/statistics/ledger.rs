use super::aggregate;
use crate::db::repository::statistics;
use crate::error::DispatchResult;
use crate::utils::time::{SharedClock, business_date};
use chrono::NaiveDate;
use chrono_tz::Tz;
use shared::models::{Dimension, Granularity, StatisticsBucket, StatisticsFilter, StatisticsRecord};
use sqlx::{SqliteConnection, SqlitePool};

/// Ledger service
///
/// Writes happen on the caller's connection so they commit or roll back with
/// the business change that produced them. Reads use the pool.
#[derive(Clone)]
pub struct StatisticsLedger {
    pub(super) pool: SqlitePool,
    clock: SharedClock,
    tz: Tz,
}

impl std::fmt::Debug for StatisticsLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticsLedger").field("tz", &self.tz).finish()
    }
}

impl StatisticsLedger {
    pub fn new(pool: SqlitePool, clock: SharedClock, tz: Tz) -> Self {
        Self { pool, clock, tz }
    }

    /// Current business day in the configured time zone
    pub fn today(&self) -> NaiveDate {
        business_date(self.clock.now_millis(), self.tz)
    }

    /// Add `delta` to today's row of `dimension`, creating it if needed.
    /// `add_count` also bumps the row's event count by one.
    pub async fn add_value(
        &self,
        conn: &mut SqliteConnection,
        dimension: &Dimension,
        delta: f64,
        add_count: bool,
    ) -> DispatchResult<StatisticsRecord> {
        let now = self.clock.now_millis();
        let day = business_date(now, self.tz);
        let record = statistics::add_value(conn, dimension, day, delta, add_count, now).await?;
        tracing::debug!(
            key = %dimension.key,
            day = %day,
            org_id = dimension.org_id,
            delta,
            value = record.value,
            count = record.count,
            "Ledger updated"
        );
        Ok(record)
    }

    /// Raw rows matching the filter, ordered by day
    pub async fn search_by_dimension(
        &self,
        filter: &StatisticsFilter,
    ) -> DispatchResult<Vec<StatisticsRecord>> {
        let mut conn = self.pool.acquire().await?;
        Ok(statistics::search(&mut conn, filter).await?)
    }

    pub async fn aggregate(
        &self,
        filter: &StatisticsFilter,
        granularity: Granularity,
    ) -> DispatchResult<Vec<StatisticsBucket>> {
        let records = self.search_by_dimension(filter).await?;
        Ok(aggregate::aggregate(&records, granularity))
    }

    /// Month table of one year (12 buckets)
    pub async fn month_table(
        &self,
        filter: &StatisticsFilter,
        year: i32,
    ) -> DispatchResult<Vec<StatisticsBucket>> {
        let filter = StatisticsFilter {
            years: vec![year],
            ..filter.clone()
        };
        let records = self.search_by_dimension(&filter).await?;
        Ok(aggregate::month_table(&records, year))
    }

    /// Rolling quarter ending with `month` of `year`
    pub async fn quarter_window(
        &self,
        filter: &StatisticsFilter,
        year: i32,
        month: u32,
    ) -> DispatchResult<StatisticsBucket> {
        let (start, end) = aggregate::quarter_window(year, month)?;
        let filter = StatisticsFilter {
            years: Vec::new(),
            from: Some(start),
            to: Some(end),
            ..filter.clone()
        };
        let records = self.search_by_dimension(&filter).await?;
        Ok(aggregate::window_bucket(&records, start, end))
    }

    /// One bucket per year, in the order given
    pub async fn year_table(
        &self,
        filter: &StatisticsFilter,
        years: &[i32],
    ) -> DispatchResult<Vec<StatisticsBucket>> {
        let filter = StatisticsFilter {
            years: years.to_vec(),
            ..filter.clone()
        };
        let records = self.search_by_dimension(&filter).await?;
        Ok(aggregate::year_table(&records, years))
    }
}
