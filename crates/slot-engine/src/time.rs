//! Minute-granularity time of day.
//!
//! `TimeOfDay` stores minutes since midnight, so comparisons are numeric rather
//! than lexicographic on strings. The value `24:00` is representable so that a
//! working day may end at midnight; it is never produced as a bookable slot.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SlotError};

/// Number of minutes in a day; also the minute value of `24:00`.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// A wall-clock time with minute precision, in the range `00:00..=24:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(MINUTES_PER_DAY);

    /// Build from hour and minute. `24:00` is accepted, anything later is not.
    pub fn from_hm(hour: u16, minute: u16) -> Result<Self> {
        if minute >= 60 || hour > 24 || (hour == 24 && minute != 0) {
            return Err(SlotError::InvalidTime(format!("{:02}:{:02}", hour, minute)));
        }
        Ok(TimeOfDay(hour * 60 + minute))
    }

    /// Build from minutes since midnight.
    pub fn from_minutes(minutes: u16) -> Result<Self> {
        if minutes > MINUTES_PER_DAY {
            return Err(SlotError::InvalidTime(format!("{} minutes", minutes)));
        }
        Ok(TimeOfDay(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Add minutes, saturating at `24:00`.
    pub fn saturating_add(self, minutes: u32) -> TimeOfDay {
        let total = u32::from(self.0).saturating_add(minutes);
        TimeOfDay(total.min(u32::from(MINUTES_PER_DAY)) as u16)
    }

    /// Minutes from `self` until `later`, negative if `later` is earlier.
    pub fn minutes_until(self, later: TimeOfDay) -> i32 {
        i32::from(later.0) - i32::from(self.0)
    }

    /// The absolute timestamp of this time on `date`. `24:00` maps to the next midnight.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + chrono::Duration::minutes(i64::from(self.0))
    }
}

/// Seconds are dropped, never rounded.
impl From<NaiveTime> for TimeOfDay {
    fn from(t: NaiveTime) -> Self {
        TimeOfDay((t.hour() * 60 + t.minute()) as u16)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = SlotError;

    /// Parses `H:MM`, `HH:MM` and `HH:MM:SS`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SlotError::InvalidTime(s.to_string());
        let mut parts = s.trim().split(':');

        let hour = parts.next().ok_or_else(invalid)?;
        let minute = parts.next().ok_or_else(invalid)?;
        if let Some(second) = parts.next() {
            if !is_digits(second)
                || second.len() != 2
                || second.parse::<u8>().map_or(true, |sec| sec >= 60)
            {
                return Err(invalid());
            }
        }
        if parts.next().is_some()
            || !is_digits(hour)
            || !is_digits(minute)
            || hour.len() > 2
            || minute.len() != 2
        {
            return Err(invalid());
        }

        let hour: u16 = hour.parse().map_err(|_| invalid())?;
        let minute: u16 = minute.parse().map_err(|_| invalid())?;
        TimeOfDay::from_hm(hour, minute).map_err(|_| invalid())
    }
}

fn is_digits(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
