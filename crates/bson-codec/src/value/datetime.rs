//! BSON UTC datetime.

use std::fmt;

use chrono::{SecondsFormat, TimeZone, Utc};

use crate::error::Error;

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DateTime(i64);

impl DateTime {
    pub const MIN: DateTime = DateTime(i64::MIN);
    pub const MAX: DateTime = DateTime(i64::MAX);

    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub const fn timestamp_millis(self) -> i64 {
        self.0
    }

    /// Converts to a chrono datetime, or `None` when out of chrono's range.
    pub fn to_chrono(self) -> Option<chrono::DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }

    pub fn from_chrono(dt: chrono::DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    /// Calendar year, when representable.
    pub fn year(self) -> Option<i32> {
        use chrono::Datelike;
        self.to_chrono().map(|dt| dt.year())
    }

    /// RFC 3339 rendering with millisecond precision and a `Z` suffix.
    pub fn try_to_rfc3339(self) -> Option<String> {
        self.to_chrono()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn parse_rfc3339(s: &str) -> Result<Self, Error> {
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.timestamp_millis()))
            .map_err(|e| Error::malformed(format!("invalid RFC 3339 date {s:?}: {e}")))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_to_rfc3339() {
            Some(s) => f.write_str(&s),
            None => write!(f, "DateTime({})", self.0),
        }
    }
}

impl From<chrono::DateTime<Utc>> for DateTime {
    fn from(dt: chrono::DateTime<Utc>) -> Self {
        Self::from_chrono(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_roundtrip() {
        let dt = DateTime::from_millis(1_356_351_330_501);
        let s = dt.try_to_rfc3339().unwrap();
        assert_eq!(s, "2012-12-24T12:15:30.501Z");
        assert_eq!(DateTime::parse_rfc3339(&s).unwrap(), dt);
        assert_eq!(dt.year(), Some(2012));
    }

    #[test]
    fn epoch_and_negative() {
        assert_eq!(
            DateTime::from_millis(0).try_to_rfc3339().unwrap(),
            "1970-01-01T00:00:00.000Z"
        );
        assert_eq!(DateTime::from_millis(-1).year(), Some(1969));
        assert_eq!(DateTime::MAX.to_chrono(), None);
    }
}
