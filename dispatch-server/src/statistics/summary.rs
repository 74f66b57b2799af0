use super::StatisticsLedger;
use crate::db::repository::{order, organization, payment, student};
use crate::error::DispatchResult;
use shared::models::Summary;

impl StatisticsLedger {
    /// Live dashboard summary over `org_ids` and every descendant institution.
    /// An empty list means the whole platform.
    pub async fn summary(&self, org_ids: &[i64]) -> DispatchResult<Summary> {
        let mut conn = self.pool.acquire().await?;

        let scope = organization::expand_descendants(&mut conn, org_ids).await?;
        if !org_ids.is_empty() && scope.is_empty() {
            return Ok(Summary::default());
        }

        let org_count = organization::count_certified(&mut conn, &scope).await?;
        let student_count = student::count(&mut conn, &scope).await?;
        let performance = payment::net_confirmed(&mut conn, &scope).await?;
        let (total, succeeded) = order::success_counts(&mut conn, &scope).await?;

        Ok(Summary {
            org_count,
            student_count,
            performance,
            success_rate: success_rate(succeeded, total),
        })
    }
}

/// succeeded ÷ total × 10 000, 0 without orders
fn success_rate(succeeded: i64, total: i64) -> i64 {
    if total == 0 {
        0
    } else {
        succeeded * 10_000 / total
    }
}
