use std::fmt;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

pub const DEFAULT_EXPIRY_SOON_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryStatus {
    Unknown,
    Expired,
    Expiring,
    Ok,
}

impl ExpiryStatus {
    pub const ALL: [ExpiryStatus; 4] = [
        ExpiryStatus::Expired,
        ExpiryStatus::Expiring,
        ExpiryStatus::Ok,
        ExpiryStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryStatus::Unknown => "unknown",
            ExpiryStatus::Expired => "expired",
            ExpiryStatus::Expiring => "expiring",
            ExpiryStatus::Ok => "ok",
        }
    }
}

impl fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar day "now" in the given zone.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Whole days from `today` until the expiry date, negative once past.
pub fn days_until(expiry_iso: &str, today: NaiveDate) -> Option<i64> {
    let expiry = NaiveDate::parse_from_str(expiry_iso, "%Y-%m-%d").ok()?;
    Some((expiry - today).num_days())
}

/// Classifies an ISO (`YYYY-MM-DD`) expiry against `today`.
///
/// Anything within `threshold_days` (inclusive, including today) is
/// expiring; a missing or non-calendar date is unknown.
pub fn classify(expiry_iso: Option<&str>, threshold_days: i64, today: NaiveDate) -> ExpiryStatus {
    let Some(iso) = expiry_iso.filter(|s| !s.is_empty()) else {
        return ExpiryStatus::Unknown;
    };
    match days_until(iso, today) {
        None => ExpiryStatus::Unknown,
        Some(diff) if diff < 0 => ExpiryStatus::Expired,
        Some(diff) if diff <= threshold_days => ExpiryStatus::Expiring,
        Some(_) => ExpiryStatus::Ok,
    }
}
