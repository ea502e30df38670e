//! Provider working plans.
//!
//! A working plan maps each weekday to the provider's opening hours and breaks.
//! It is stored by the settings store as a JSON string such as:
//!
//! ```json
//! {
//!   "monday": {"start": "09:00", "end": "18:00",
//!              "breaks": [{"start": "14:30", "end": "15:00"}]},
//!   "sunday": null
//! }
//! ```
//!
//! A weekday that is missing or `null` is a day off.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::time::TimeOfDay;

/// A break inside a working day. `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakInterval {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

/// Opening hours for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingDay {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    /// Sorted ascending and non-overlapping.
    #[serde(default)]
    pub breaks: Vec<BreakInterval>,
}

impl WorkingDay {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            start,
            end,
            breaks: Vec::new(),
        }
    }

    pub fn with_break(mut self, start: TimeOfDay, end: TimeOfDay) -> Self {
        self.breaks.push(BreakInterval { start, end });
        self
    }

    /// Check the day's invariants.
    ///
    /// # Errors
    /// Returns `SlotError::Validation` if the day or any break has `end <= start`,
    /// or if the breaks are out of order or overlap.
    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(SlotError::Validation(format!(
                "working day ends ({}) before it starts ({})",
                self.end, self.start
            )));
        }

        let mut previous_end: Option<TimeOfDay> = None;
        for b in &self.breaks {
            if b.end <= b.start {
                return Err(SlotError::Validation(format!(
                    "break {}-{} ends before it starts",
                    b.start, b.end
                )));
            }
            if let Some(prev) = previous_end {
                if b.start < prev {
                    return Err(SlotError::Validation(format!(
                        "break {}-{} is out of order or overlaps the previous break",
                        b.start, b.end
                    )));
                }
            }
            previous_end = Some(b.end);
        }

        Ok(())
    }
}

/// Weekly working plan of a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingPlan {
    #[serde(default)]
    pub monday: Option<WorkingDay>,
    #[serde(default)]
    pub tuesday: Option<WorkingDay>,
    #[serde(default)]
    pub wednesday: Option<WorkingDay>,
    #[serde(default)]
    pub thursday: Option<WorkingDay>,
    #[serde(default)]
    pub friday: Option<WorkingDay>,
    #[serde(default)]
    pub saturday: Option<WorkingDay>,
    #[serde(default)]
    pub sunday: Option<WorkingDay>,
}

impl WorkingPlan {
    /// Deserialize a plan from the JSON string kept in the provider settings.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn day(&self, weekday: Weekday) -> Option<&WorkingDay> {
        match weekday {
            Weekday::Mon => self.monday.as_ref(),
            Weekday::Tue => self.tuesday.as_ref(),
            Weekday::Wed => self.wednesday.as_ref(),
            Weekday::Thu => self.thursday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Sun => self.sunday.as_ref(),
        }
    }

    pub fn set_day(&mut self, weekday: Weekday, day: Option<WorkingDay>) {
        let slot = match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = day;
    }

    /// The working day that applies to a calendar date, if the provider works that day.
    pub fn for_date(&self, date: NaiveDate) -> Option<&WorkingDay> {
        self.day(date.weekday())
    }
}
