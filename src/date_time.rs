use chrono::{SecondsFormat, TimeZone, Utc};
use std::fmt;

/// Ticks between 1601-01-01 and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;
/// 9999-12-31T23:59:59.9999999Z.
const MAX_TICKS: i64 = 2_650_467_743_999_999_999;

/// An OPC UA timestamp: 100 ns ticks since 1601-01-01 UTC.
///
/// Tick counts outside `[MIN, MAX]` are clamped to the sentinels, so a
/// `DateTime` is always convertible to a `chrono` timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateTime {
    ticks: i64,
}

impl DateTime {
    pub const MIN: DateTime = DateTime { ticks: 0 };
    pub const MAX: DateTime = DateTime { ticks: MAX_TICKS };

    pub fn from_ticks(ticks: i64) -> Self {
        Self {
            ticks: ticks.clamp(0, MAX_TICKS),
        }
    }

    pub fn ticks(self) -> i64 {
        self.ticks
    }

    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    pub fn is_min(self) -> bool {
        self.ticks == 0
    }

    pub fn is_max(self) -> bool {
        self.ticks == MAX_TICKS
    }

    pub fn to_chrono(self) -> chrono::DateTime<Utc> {
        let unix = self.ticks - UNIX_EPOCH_TICKS;
        let secs = unix.div_euclid(TICKS_PER_SECOND);
        let nanos = (unix.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
        Utc.timestamp_opt(secs, nanos)
            .single()
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC)
    }

    /// RFC 3339 text with as many fractional digits as needed.
    pub fn to_rfc3339(self) -> String {
        self.to_chrono().to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn parse_rfc3339(text: &str) -> Option<Self> {
        chrono::DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| Self::from(dt.with_timezone(&Utc)))
    }
}

impl From<chrono::DateTime<Utc>> for DateTime {
    fn from(value: chrono::DateTime<Utc>) -> Self {
        let ticks = value
            .timestamp()
            .checked_mul(TICKS_PER_SECOND)
            .and_then(|t| t.checked_add(i64::from(value.timestamp_subsec_nanos() / 100)))
            .and_then(|t| t.checked_add(UNIX_EPOCH_TICKS));
        match ticks {
            Some(ticks) => Self::from_ticks(ticks),
            None if value.timestamp() < 0 => Self::MIN,
            None => Self::MAX,
        }
    }
}

impl From<DateTime> for chrono::DateTime<Utc> {
    fn from(value: DateTime) -> Self {
        value.to_chrono()
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}
