//! 时间工具: 时钟抽象与业务时区日期
//!
//! Services never read the wall clock directly; they hold an `Arc<dyn Clock>`
//! so tests can move time.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use std::sync::Arc;

/// Source of "now" in Unix millis
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        shared::util::now_millis()
    }
}

pub type SharedClock = Arc<dyn Clock>;

/// Unix millis → calendar date in the business time zone
pub fn business_date(millis: i64, tz: Tz) -> NaiveDate {
    DateTime::from_timestamp_millis(millis)
        .map(|utc| utc.with_timezone(&tz).date_naive())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_date_uses_timezone() {
        // 2024-03-05 17:30 UTC is already 2024-03-06 in Shanghai (UTC+8)
        let millis = 1_709_659_800_000;
        assert_eq!(
            business_date(millis, chrono_tz::UTC),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(
            business_date(millis, chrono_tz::Asia::Shanghai),
            NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()
        );
    }
}
