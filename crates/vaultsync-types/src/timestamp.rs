use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Wall-clock timestamp with a UTC offset.
///
/// This is the ordering key of the whole merge algorithm: whichever side of
/// a merge carries the greater `last_modified` timestamp wins. Comparison is
/// by instant, so two timestamps denoting the same moment in different
/// offsets compare equal.
///
/// The textual encoding is RFC 3339 (a profile of ISO 8601) with the offset
/// preserved, e.g. `2008-09-21T15:51:30.346+02:00`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<FixedOffset>);

impl Timestamp {
    /// The current wall-clock time in the local offset.
    pub fn now() -> Self {
        Self(Local::now().fixed_offset())
    }

    /// Parse from an RFC 3339 date-time string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        DateTime::parse_from_rfc3339(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidTimestamp(format!("{s}: {e}")))
    }

    /// RFC 3339 string representation, offset preserved.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }

    /// This timestamp shifted forward by the given number of milliseconds.
    /// Saturates on overflow.
    pub fn plus_millis(&self, millis: i64) -> Self {
        match self.0.checked_add_signed(Duration::milliseconds(millis)) {
            Some(dt) => Self(dt),
            None => *self,
        }
    }

    /// The underlying chrono value.
    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }
}

impl std::str::FromStr for Timestamp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_rfc3339())
    }
}
