// Copyright © 2024 Pathway

use std::ops::{Add, Mul, Neg, Sub};

use chrono::{self, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use super::{Error, Result};

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = NANOS_PER_SECOND * 60;
const NANOS_PER_HOUR: i64 = NANOS_PER_MINUTE * 60;

/// An instant in UTC, stored as nanoseconds since the Unix epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DateTimeUtc {
    timestamp: i64,
}

impl DateTimeUtc {
    /// The epoch origin. Representatives without valid data carry it.
    pub const EPOCH: DateTimeUtc = DateTimeUtc { timestamp: 0 };

    pub fn new(timestamp: i64) -> Self {
        Self { timestamp }
    }

    pub fn now() -> Self {
        chrono::Utc::now().into()
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self::new(seconds.saturating_mul(NANOS_PER_SECOND))
    }

    pub fn from_millis(millis: i64) -> Self {
        Self::new(millis.saturating_mul(1_000_000))
    }

    pub fn strptime(date_string: &str, format: &str) -> Result<Self> {
        if let Ok(datetime) = chrono::DateTime::parse_from_str(date_string, format) {
            return Ok(datetime.into());
        }
        match chrono::NaiveDateTime::parse_from_str(date_string, format) {
            Ok(naive) => Ok(naive.and_utc().into()),
            Err(e) => Err(Error::ParseError(format!(
                "cannot parse date {date_string:?} using format {format:?}: {e}"
            ))),
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn timestamp_seconds(&self) -> i64 {
        self.timestamp.div_euclid(NANOS_PER_SECOND)
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.div_euclid(1_000_000)
    }

    pub fn is_epoch(&self) -> bool {
        self.timestamp == 0
    }

    pub fn strftime(&self, format: &str) -> String {
        chrono::Utc
            .timestamp_nanos(self.timestamp)
            .format(format)
            .to_string()
    }
}

impl<Tz: chrono::TimeZone> From<chrono::DateTime<Tz>> for DateTimeUtc {
    fn from(value: chrono::DateTime<Tz>) -> Self {
        // Out of the i64 nanosecond range (years before 1677 or after 2262).
        let timestamp = value.timestamp_nanos_opt().unwrap_or_else(|| {
            if value.timestamp() < 0 {
                i64::MIN
            } else {
                i64::MAX
            }
        });
        Self { timestamp }
    }
}

impl Sub for DateTimeUtc {
    type Output = Duration;

    fn sub(self, other: Self) -> Self::Output {
        Duration {
            duration: self.timestamp.saturating_sub(other.timestamp),
        }
    }
}

impl Add<Duration> for DateTimeUtc {
    type Output = Self;

    fn add(self, other: Duration) -> Self::Output {
        DateTimeUtc {
            timestamp: self.timestamp.saturating_add(other.duration),
        }
    }
}

impl Sub<Duration> for DateTimeUtc {
    type Output = Self;

    fn sub(self, other: Duration) -> Self::Output {
        DateTimeUtc {
            timestamp: self.timestamp.saturating_sub(other.duration),
        }
    }
}

impl Display for DateTimeUtc {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.strftime("%Y-%m-%dT%H:%M:%S%.3f%z"))
    }
}

/// A signed span of time with nanosecond resolution.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Duration {
    duration: i64,
}

impl Duration {
    pub const ZERO: Duration = Duration { duration: 0 };

    pub fn new(duration: i64) -> Self {
        Self { duration }
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self::new(seconds.saturating_mul(NANOS_PER_SECOND))
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self::new(minutes.saturating_mul(NANOS_PER_MINUTE))
    }

    /// Fractional hours are allowed, configuration windows are given in hours.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_hours(hours: f64) -> Self {
        Self::new((hours * NANOS_PER_HOUR as f64) as i64)
    }

    pub fn nanoseconds(&self) -> i64 {
        self.duration
    }

    pub fn seconds(&self) -> i64 {
        self.duration / NANOS_PER_SECOND
    }

    pub fn minutes(&self) -> i64 {
        self.duration / NANOS_PER_MINUTE
    }

    pub fn hours(&self) -> i64 {
        self.duration / NANOS_PER_HOUR
    }

    pub fn is_negative(&self) -> bool {
        self.duration < 0
    }

    /// Converts to a std duration, negative spans become zero.
    pub fn to_std(self) -> std::time::Duration {
        u64::try_from(self.duration).map_or(std::time::Duration::ZERO, std::time::Duration::from_nanos)
    }
}

impl Neg for Duration {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Duration {
            duration: self.duration.saturating_neg(),
        }
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Duration {
            duration: self.duration.saturating_add(other.duration),
        }
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Duration {
            duration: self.duration.saturating_sub(other.duration),
        }
    }
}

impl Mul<i64> for Duration {
    type Output = Self;

    fn mul(self, other: i64) -> Self::Output {
        Duration {
            duration: self.duration.saturating_mul(other),
        }
    }
}

impl Display for Duration {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let timeunits = [
            (NANOS_PER_HOUR * 24, "d"),
            (NANOS_PER_HOUR, "h"),
            (NANOS_PER_MINUTE, "m"),
            (NANOS_PER_SECOND, "s"),
            (1, "ns"),
        ];
        if self.duration == 0 {
            return write!(fmt, "0s");
        }
        let mut output = vec![];
        let mut remaining_nanoseconds = self.duration;
        for (num_nanoseconds, unit_name) in timeunits {
            if remaining_nanoseconds / num_nanoseconds != 0 {
                output.push(format!(
                    "{}{}",
                    remaining_nanoseconds / num_nanoseconds,
                    unit_name
                ));
                remaining_nanoseconds %= num_nanoseconds;
            }
        }
        write!(fmt, "{}", output.join(" "))
    }
}
