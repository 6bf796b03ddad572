use chrono::{Datelike, Local, NaiveDateTime, NaiveTime, TimeZone, Weekday};
use std::fmt;

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z, the reference
/// date Safari's `visit_time` column counts from.
pub const STORE_EPOCH_OFFSET: i64 = 978_307_200;

const FULL_FORMAT: &str = "%A, %B %d %Y %H:%M:%S";
const TABBED_FORMAT: &str = "%A\t%B\t%d\t%Y\t%H:%M:%S";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("timestamp {0} is outside the representable calendar range")]
    InvalidTimestamp(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitQuery {
    pub url: String,
    pub max_visits: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub id: i64,
    pub url: String,
    pub visit_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub timestamp: i64,
    pub title: String,
}

/// Read side of the browser's history database.
pub trait HistorySource {
    fn find_item(&self, url: &str) -> anyhow::Result<Option<HistoryItem>>;
    /// Oldest recorded visit for the item, if any.
    fn first_visit(&self, item_id: i64) -> anyhow::Result<Option<Visit>>;
    /// The `row_limit` most recent visits (all when `None`), oldest first.
    fn recent_visits(&self, item_id: i64, row_limit: Option<u32>) -> anyhow::Result<Vec<Visit>>;
}

/// Wall-clock time of a visit in some timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarMoment(NaiveDateTime);

impl CalendarMoment {
    pub fn from_store_offset(offset: i64) -> Result<Self, TimeError> {
        Self::from_store_offset_in(offset, &Local)
    }

    pub fn from_store_offset_in<Tz: TimeZone>(offset: i64, tz: &Tz) -> Result<Self, TimeError> {
        let unix = offset
            .checked_add(STORE_EPOCH_OFFSET)
            .ok_or(TimeError::InvalidTimestamp(offset))?;
        tz.timestamp_opt(unix, 0)
            .earliest()
            .map(|dt| CalendarMoment(dt.naive_local()))
            .ok_or(TimeError::InvalidTimestamp(offset))
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn time(&self) -> NaiveTime {
        self.0.time()
    }

    pub fn full(&self) -> String {
        self.0.format(FULL_FORMAT).to_string()
    }

    pub fn tabbed(&self) -> String {
        self.0.format(TABBED_FORMAT).to_string()
    }
}

impl fmt::Display for CalendarMoment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn store_epoch_is_new_year_2001() {
        let m = CalendarMoment::from_store_offset_in(0, &Utc).unwrap();
        assert_eq!(m.full(), "Monday, January 01 2001 00:00:00");
        assert_eq!(m.tabbed(), "Monday\tJanuary\t01\t2001\t00:00:00");
        assert_eq!(m.weekday(), Weekday::Mon);
        assert_eq!((m.year(), m.month(), m.day()), (2001, 1, 1));
    }

    #[test]
    fn negative_offset_reaches_unix_epoch() {
        let m = CalendarMoment::from_store_offset_in(-STORE_EPOCH_OFFSET, &Utc).unwrap();
        assert_eq!(m.full(), "Thursday, January 01 1970 00:00:00");
    }

    #[test]
    fn full_and_tabbed_agree() {
        for offset in [0, 1, 59, 86_399, 86_400, 700_000_000, 123_456_789] {
            let m = CalendarMoment::from_store_offset_in(offset, &Utc).unwrap();
            let tabbed: Vec<String> = m.tabbed().split('\t').map(str::to_string).collect();
            assert_eq!(tabbed.len(), 5);
            let rebuilt = format!(
                "{}, {} {} {} {}",
                tabbed[0], tabbed[1], tabbed[2], tabbed[3], tabbed[4]
            );
            assert_eq!(rebuilt, m.full());
            assert_eq!(m, CalendarMoment::from_store_offset_in(offset, &Utc).unwrap());
        }
    }

    #[test]
    fn offset_applied_once_in_fixed_zone() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let m = CalendarMoment::from_store_offset_in(3_600, &tz).unwrap();
        assert_eq!(m.full(), "Monday, January 01 2001 03:00:00");
        assert_eq!(m.time(), NaiveTime::from_hms_opt(3, 0, 0).unwrap());
    }

    #[test]
    fn local_conversion_is_deterministic() {
        let a = CalendarMoment::from_store_offset(612_345_678).unwrap();
        let b = CalendarMoment::from_store_offset(612_345_678).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.full());
    }

    #[test]
    fn overflow_is_an_error() {
        assert_eq!(
            CalendarMoment::from_store_offset_in(i64::MAX, &Utc),
            Err(TimeError::InvalidTimestamp(i64::MAX))
        );
        assert!(CalendarMoment::from_store_offset_in(i64::MIN / 2, &Utc).is_err());
    }
}
