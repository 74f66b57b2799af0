//! Calendar bucketing of ledger rows
//!
//! All functions are pure over already-fetched rows, so every bucket sum is
//! exactly the sum of the daily rows it covers.

use crate::error::{DispatchError, DispatchResult};
use chrono::{Datelike, Months, NaiveDate};
use shared::models::{Granularity, StatisticsBucket, StatisticsRecord};
use std::collections::BTreeMap;

/// Bucket label of `day` at `granularity`
pub fn bucket_label(day: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => day.format("%Y-%m-%d").to_string(),
        Granularity::Week => {
            let week = day.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        Granularity::Month => day.format("%Y-%m").to_string(),
        Granularity::Quarter => format!("{}-Q{}", day.year(), (day.month() - 1) / 3 + 1),
        Granularity::Year => day.year().to_string(),
    }
}

/// Group rows into labelled buckets, ascending by label
pub fn aggregate(records: &[StatisticsRecord], granularity: Granularity) -> Vec<StatisticsBucket> {
    let mut buckets: BTreeMap<String, (f64, i64)> = BTreeMap::new();
    for record in records {
        let entry = buckets
            .entry(bucket_label(record.day, granularity))
            .or_default();
        entry.0 += record.value;
        entry.1 += record.count;
    }
    buckets
        .into_iter()
        .map(|(label, (value, count))| StatisticsBucket { label, value, count })
        .collect()
}

/// Twelve month buckets of `year`, zero-filled
pub fn month_table(records: &[StatisticsRecord], year: i32) -> Vec<StatisticsBucket> {
    let mut months = [(0.0_f64, 0_i64); 12];
    for record in records.iter().filter(|r| r.day.year() == year) {
        let slot = &mut months[record.day.month0() as usize];
        slot.0 += record.value;
        slot.1 += record.count;
    }
    months
        .iter()
        .enumerate()
        .map(|(i, (value, count))| StatisticsBucket {
            label: format!("{year}-{:02}", i + 1),
            value: *value,
            count: *count,
        })
        .collect()
}

/// One bucket per requested year, in request order, zero-filled
pub fn year_table(records: &[StatisticsRecord], years: &[i32]) -> Vec<StatisticsBucket> {
    years
        .iter()
        .map(|&year| {
            let (value, count) = records
                .iter()
                .filter(|r| r.day.year() == year)
                .fold((0.0, 0), |(v, c), r| (v + r.value, c + r.count));
            StatisticsBucket {
                label: year.to_string(),
                value,
                count,
            }
        })
        .collect()
}

/// Inclusive date range of the rolling quarter ending with `month`:
/// the month itself and the two before it, crossing into the previous year
/// when needed (Feb 2024 → 2023-12-01 ..= 2024-02-29).
pub fn quarter_window(year: i32, month: u32) -> DispatchResult<(NaiveDate, NaiveDate)> {
    let invalid = || DispatchError::Validation(format!("Invalid quarter window {year}-{month}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let start = first.checked_sub_months(Months::new(2)).ok_or_else(invalid)?;
    let end = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;
    Ok((start, end))
}

/// Sum rows inside an inclusive date range into one bucket labelled `start~end`
pub fn window_bucket(
    records: &[StatisticsRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> StatisticsBucket {
    let (value, count) = records
        .iter()
        .filter(|r| r.day >= start && r.day <= end)
        .fold((0.0, 0), |(v, c), r| (v + r.value, c + r.count));
    StatisticsBucket {
        label: format!("{}~{}", start.format("%Y-%m"), end.format("%Y-%m")),
        value,
        count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(day: NaiveDate, value: f64) -> StatisticsRecord {
        StatisticsRecord {
            id: 0,
            key: "order".into(),
            day,
            author_id: 0,
            org_id: 0,
            publisher_id: 0,
            source: String::new(),
            value,
            count: 1,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn labels() {
        let d = day(2024, 3, 5);
        assert_eq!(bucket_label(d, Granularity::Day), "2024-03-05");
        assert_eq!(bucket_label(d, Granularity::Week), "2024-W10");
        assert_eq!(bucket_label(d, Granularity::Month), "2024-03");
        assert_eq!(bucket_label(d, Granularity::Quarter), "2024-Q1");
        assert_eq!(bucket_label(d, Granularity::Year), "2024");
        // 2021-01-01 belongs to ISO week 53 of 2020
        assert_eq!(bucket_label(day(2021, 1, 1), Granularity::Week), "2020-W53");
    }

    #[test]
    fn every_granularity_partitions_the_same_total() {
        let rows: Vec<_> = (0..400_u64)
            .map(|i| row(day(2023, 6, 1) + chrono::Days::new(i), (i % 7) as f64 - 2.0))
            .collect();
        let total: f64 = rows.iter().map(|r| r.value).sum();
        let count: i64 = rows.iter().map(|r| r.count).sum();

        for g in [
            Granularity::Day,
            Granularity::Week,
            Granularity::Month,
            Granularity::Quarter,
            Granularity::Year,
        ] {
            let buckets = aggregate(&rows, g);
            assert_eq!(buckets.iter().map(|b| b.value).sum::<f64>(), total, "{g:?}");
            assert_eq!(buckets.iter().map(|b| b.count).sum::<i64>(), count, "{g:?}");
        }

        let years = year_table(&rows, &[2023, 2024]);
        assert_eq!(years.iter().map(|b| b.value).sum::<f64>(), total);
        for y in [2023, 2024] {
            let months = month_table(&rows, y);
            assert_eq!(months.len(), 12);
            let year_bucket = years.iter().find(|b| b.label == y.to_string()).unwrap();
            assert_eq!(months.iter().map(|b| b.value).sum::<f64>(), year_bucket.value);
        }
    }

    #[test]
    fn month_table_is_zero_filled() {
        let rows = vec![row(day(2024, 2, 10), 5.0), row(day(2023, 2, 10), 7.0)];
        let table = month_table(&rows, 2024);
        assert_eq!(table[0], StatisticsBucket { label: "2024-01".into(), value: 0.0, count: 0 });
        assert_eq!(table[1].value, 5.0);
        assert_eq!(table[11].label, "2024-12");
    }

    #[test]
    fn quarter_window_crosses_year_boundary() {
        assert_eq!(quarter_window(2024, 2).unwrap(), (day(2023, 12, 1), day(2024, 2, 29)));
        assert_eq!(quarter_window(2024, 1).unwrap(), (day(2023, 11, 1), day(2024, 1, 31)));
        assert_eq!(quarter_window(2024, 6).unwrap(), (day(2024, 4, 1), day(2024, 6, 30)));
        assert!(quarter_window(2024, 13).is_err());
        assert!(quarter_window(2024, 0).is_err());

        let rows = vec![
            row(day(2023, 11, 30), 1.0),
            row(day(2023, 12, 1), 2.0),
            row(day(2024, 2, 29), 4.0),
            row(day(2024, 3, 1), 8.0),
        ];
        let (start, end) = quarter_window(2024, 2).unwrap();
        let bucket = window_bucket(&rows, start, end);
        assert_eq!(bucket.label, "2023-12~2024-02");
        assert_eq!(bucket.value, 6.0);
        assert_eq!(bucket.count, 2);
    }
}
