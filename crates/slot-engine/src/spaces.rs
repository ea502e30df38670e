//! Free spaces within a working day.
//!
//! The working day is first split around its breaks, then every resulting space
//! is split around the reservations that overlap it. Busy periods are merged
//! before the gaps are computed, so overlapping or touching reservations never
//! leave a zero-length or duplicated space behind.

use serde::{Deserialize, Serialize};

use crate::plan::WorkingDay;
use crate::time::TimeOfDay;

/// A contiguous free period `[start, end)` within a working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSpace {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeSpace {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    pub fn duration_minutes(&self) -> i32 {
        self.start.minutes_until(self.end)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True if `[start, end)` lies strictly inside this space, touching neither edge.
    pub fn strictly_contains(&self, start: TimeOfDay, end: TimeOfDay) -> bool {
        self.start < start && self.end > end
    }

    /// True if `[start, end)` shares at least one minute with this space.
    pub fn overlaps(&self, start: TimeOfDay, end: TimeOfDay) -> bool {
        start < self.end && self.start < end
    }
}

/// Split a working day around its breaks.
///
/// With no breaks the whole day is one space. Otherwise there is one space from
/// the day start (or the previous break's end) up to each break, and a final
/// space from the last break's end to the day end. Breaks reaching past the day
/// are clipped and empty spaces are dropped.
///
/// Expects a day that passed [`WorkingDay::validate`].
pub fn split_by_breaks(day: &WorkingDay) -> Vec<TimeSpace> {
    let mut spaces = Vec::with_capacity(day.breaks.len() + 1);
    let mut cursor = day.start;

    for b in &day.breaks {
        spaces.push(TimeSpace::new(cursor, b.start.min(day.end)));
        cursor = cursor.max(b.end);
    }
    spaces.push(TimeSpace::new(cursor, day.end));

    spaces.retain(|s| !s.is_empty());
    spaces
}

/// Merge overlapping or adjacent busy periods, clipped to the given space.
///
/// Returns a sorted, non-overlapping list of (start, end) intervals.
fn merge_busy_periods(
    busy: &[(TimeOfDay, TimeOfDay)],
    space: &TimeSpace,
) -> Vec<(TimeOfDay, TimeOfDay)> {
    let mut intervals: Vec<(TimeOfDay, TimeOfDay)> = busy
        .iter()
        .filter(|&&(start, end)| space.overlaps(start, end))
        .map(|&(start, end)| (start.max(space.start), end.min(space.end)))
        .collect();

    intervals.sort_unstable();

    let mut merged: Vec<(TimeOfDay, TimeOfDay)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }

    merged
}

/// Split free spaces around reserved intervals.
///
/// A space with no reservation overlapping it passes through unchanged. A
/// reservation strictly inside a space splits it in two; a reservation touching
/// an edge trims it. With no reservations the input is returned as is.
///
/// The result is sorted by start time and contains no duplicate spaces.
pub fn split_by_reservations(
    spaces: &[TimeSpace],
    reserved: &[(TimeOfDay, TimeOfDay)],
) -> Vec<TimeSpace> {
    if reserved.is_empty() {
        return spaces.to_vec();
    }

    let mut result = Vec::with_capacity(spaces.len() + reserved.len());

    for space in spaces {
        let mut cursor = space.start;
        for (busy_start, busy_end) in merge_busy_periods(reserved, space) {
            if cursor < busy_start {
                result.push(TimeSpace::new(cursor, busy_start));
            }
            cursor = cursor.max(busy_end);
        }
        if cursor < space.end {
            result.push(TimeSpace::new(cursor, space.end));
        }
    }

    result.sort_unstable();
    result.dedup();
    result
}
