//! Statistics Ledger Repository
//!
//! One row per (key, day, author, org, publisher, source). Writes are a single
//! additive upsert guarded by the table's UNIQUE constraint, so concurrent
//! confirmations on the same tuple never lose an update.

use super::{RepoResult, push_in_filter};
use chrono::NaiveDate;
use shared::models::{Dimension, StatisticsFilter, StatisticsRecord};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const COLUMNS: &str =
    "id, key, day, author_id, org_id, publisher_id, source, value, count, created_at, updated_at";

/// Add `delta` to the tuple's value (and 1 to its count when `add_count`),
/// creating the row on first write
pub async fn add_value(
    conn: &mut SqliteConnection,
    dimension: &Dimension,
    day: NaiveDate,
    delta: f64,
    add_count: bool,
    now: i64,
) -> RepoResult<StatisticsRecord> {
    let record = sqlx::query_as::<_, StatisticsRecord>(&format!(
        "INSERT INTO statistics_record (key, day, author_id, org_id, publisher_id, source, value, count, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) \
         ON CONFLICT(key, day, author_id, org_id, publisher_id, source) DO UPDATE SET \
         value = value + excluded.value, count = count + excluded.count, updated_at = excluded.updated_at \
         RETURNING {COLUMNS}"
    ))
    .bind(&dimension.key)
    .bind(day)
    .bind(dimension.author_id)
    .bind(dimension.org_id)
    .bind(dimension.publisher_id)
    .bind(&dimension.source)
    .bind(delta)
    .bind(i64::from(add_count))
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

/// Rows matching every set field of the filter, ordered by day
pub async fn search(
    conn: &mut SqliteConnection,
    filter: &StatisticsFilter,
) -> RepoResult<Vec<StatisticsRecord>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {COLUMNS} FROM statistics_record WHERE 1 = 1"
    ));
    if let Some(key) = &filter.key {
        qb.push(" AND key = ").push_bind(key.clone());
    }
    if let Some(author_id) = filter.author_id {
        qb.push(" AND author_id = ").push_bind(author_id);
    }
    push_in_filter(&mut qb, "org_id", &filter.org_ids);
    if let Some(publisher_id) = filter.publisher_id {
        qb.push(" AND publisher_id = ").push_bind(publisher_id);
    }
    if let Some(source) = &filter.source {
        qb.push(" AND source = ").push_bind(source.clone());
    }
    let years: Vec<i64> = filter.years.iter().map(|y| i64::from(*y)).collect();
    push_in_filter(&mut qb, "CAST(substr(day, 1, 4) AS INTEGER)", &years);
    if let Some(from) = filter.from {
        qb.push(" AND day >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND day <= ").push_bind(to);
    }
    qb.push(" ORDER BY day, id");

    let records = qb.build_query_as::<StatisticsRecord>().fetch_all(conn).await?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestDb;
    use shared::models::KEY_ORDER;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn upsert_accumulates_on_same_tuple() {
        let db = TestDb::new().await;
        let mut conn = db.conn().await;
        let dim = Dimension::new(KEY_ORDER).org(5).author(7).publisher(3);

        let first = add_value(&mut conn, &dim, day(2024, 3, 1), 1000.0, true, 1).await.unwrap();
        assert_eq!(first.value, 1000.0);
        assert_eq!(first.count, 1);

        let second = add_value(&mut conn, &dim, day(2024, 3, 1), -300.0, false, 2).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.value, 700.0);
        assert_eq!(second.count, 1);
        assert_eq!(second.updated_at, 2);

        // Another day is another row
        let other = add_value(&mut conn, &dim, day(2024, 3, 2), 50.0, true, 3).await.unwrap();
        assert_ne!(other.id, first.id);
    }

    #[tokio::test]
    async fn unset_dimensions_still_collide() {
        let db = TestDb::new().await;
        let mut conn = db.conn().await;
        let dim = Dimension::new("student");

        add_value(&mut conn, &dim, day(2024, 1, 1), 1.0, true, 1).await.unwrap();
        let again = add_value(&mut conn, &dim, day(2024, 1, 1), 1.0, true, 1).await.unwrap();
        assert_eq!(again.count, 2);

        let rows = search(&mut conn, &StatisticsFilter::for_key("student")).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn search_filters_by_dimension_year_and_range() {
        let db = TestDb::new().await;
        let mut conn = db.conn().await;
        let org5 = Dimension::new(KEY_ORDER).org(5);
        let org6 = Dimension::new(KEY_ORDER).org(6);

        add_value(&mut conn, &org5, day(2023, 12, 31), 1.0, true, 1).await.unwrap();
        add_value(&mut conn, &org5, day(2024, 1, 15), 2.0, true, 1).await.unwrap();
        add_value(&mut conn, &org5, day(2024, 2, 15), 4.0, true, 1).await.unwrap();
        add_value(&mut conn, &org6, day(2024, 1, 15), 8.0, true, 1).await.unwrap();

        let filter = StatisticsFilter {
            org_ids: vec![5],
            years: vec![2024],
            ..StatisticsFilter::for_key(KEY_ORDER)
        };
        let rows = search(&mut conn, &filter).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.value).collect::<Vec<_>>(), vec![2.0, 4.0]);

        let filter = StatisticsFilter {
            from: Some(day(2023, 12, 31)),
            to: Some(day(2024, 1, 15)),
            ..StatisticsFilter::for_key(KEY_ORDER)
        };
        let total: f64 = search(&mut conn, &filter).await.unwrap().iter().map(|r| r.value).sum();
        assert_eq!(total, 11.0);
    }
}
