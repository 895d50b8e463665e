//! Monthly net-worth snapshots.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A calendar month key in `YYYY-MM` form.
///
/// Keys are stored as written; loading a document never rejects an odd
/// key, it simply won't match any month the clock produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthKey(String);

impl MonthKey {
    /// Wraps an already formatted key.
    #[inline]
    #[must_use]
    pub fn new<T: Into<String>>(key: T) -> Self {
        Self(key.into())
    }

    /// Builds the key for the month containing `date`.
    #[inline]
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self(format!("{:04}-{:02}", date.year(), date.month()))
    }

    /// Builds the key for the month containing `at` (UTC).
    #[inline]
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self::from_date(at.date_naive())
    }

    /// Returns the key for the current UTC month.
    #[inline]
    #[must_use]
    pub fn current() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Returns the key as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for MonthKey {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One monthly snapshot of total net worth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataPoint {
    /// Month of the snapshot.
    pub date: MonthKey,
    /// Net worth in HKD at the time of the last recompute that month.
    #[serde(rename = "totalValueHKD")]
    pub total_value_hkd: f64,
}

impl HistoricalDataPoint {
    /// Creates a snapshot.
    #[inline]
    #[must_use]
    pub const fn new(date: MonthKey, total_value_hkd: f64) -> Self {
        Self {
            date,
            total_value_hkd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_key_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(MonthKey::from_date(date).as_str(), "2024-03");
    }

    #[test]
    fn month_key_from_datetime_uses_utc() {
        let at = DateTime::parse_from_rfc3339("2023-12-31T23:30:00-02:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(MonthKey::from_datetime(at).as_str(), "2024-01");
    }

    #[test]
    fn data_point_uses_document_field_names() {
        let point = HistoricalDataPoint::new(MonthKey::new("2023-05"), 180_000.0);
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(json, r#"{"date":"2023-05","totalValueHKD":180000.0}"#);
        let back: HistoricalDataPoint = serde_json::from_str(r#"{"date":"2023-05","totalValueHKD":180000}"#).unwrap();
        assert_eq!(back, point);
    }
}
