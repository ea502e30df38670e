//! Existing appointments that occupy a provider's day.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::time::TimeOfDay;

/// An existing appointment, in provider-local wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedInterval {
    /// Opaque identifier assigned by the appointment store.
    pub id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ReservedInterval {
    pub fn new(id: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            start,
            end,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(SlotError::Validation(format!(
                "reservation {} ends ({}) before it starts ({})",
                self.id, self.end, self.start
            )));
        }
        Ok(())
    }

    /// The part of this reservation that falls on `date`, as times of day.
    ///
    /// A reservation that began on an earlier date starts at `00:00`; one that
    /// runs past midnight ends at `24:00`. Returns `None` when the reservation
    /// does not touch `date` or covers less than a minute of it.
    pub fn clip_to(&self, date: NaiveDate) -> Option<(TimeOfDay, TimeOfDay)> {
        let day_start = TimeOfDay::MIDNIGHT.on(date);
        let day_end = TimeOfDay::END_OF_DAY.on(date);
        if self.start >= day_end || self.end <= day_start {
            return None;
        }

        let start = if self.start <= day_start {
            TimeOfDay::MIDNIGHT
        } else {
            TimeOfDay::from(self.start.time())
        };
        let end = if self.end >= day_end {
            TimeOfDay::END_OF_DAY
        } else {
            TimeOfDay::from(self.end.time())
        };

        (start < end).then_some((start, end))
    }
}
