//! Quarter-hour quantization of free spaces into candidate start times.

use crate::spaces::TimeSpace;
use crate::time::TimeOfDay;

/// Candidate start times are aligned to, and spaced by, this many minutes.
pub const SLOT_STEP_MINUTES: u16 = 15;

/// Round up to the next quarter hour.
///
/// Times already on a quarter stay. Otherwise `:01-:14` becomes `:15`,
/// `:16-:29` becomes `:30`, `:31-:44` becomes `:45` and `:46-:59` becomes
/// the next full hour.
pub fn round_up_to_quarter(time: TimeOfDay) -> TimeOfDay {
    let minute = time.minute();
    if minute % SLOT_STEP_MINUTES == 0 {
        return time;
    }
    let next_quarter = (minute / SLOT_STEP_MINUTES + 1) * SLOT_STEP_MINUTES;
    time.saturating_add(u32::from(next_quarter - minute))
}

/// Enumerate candidate start times within one free space.
///
/// Starting at the rounded space start, a candidate is emitted while the time
/// left until the space end is strictly greater than `duration_minutes`, then
/// the cursor advances by a quarter hour.
pub fn enumerate_slots(space: &TimeSpace, duration_minutes: u32) -> Vec<TimeOfDay> {
    let mut slots = Vec::new();
    let mut cursor = round_up_to_quarter(space.start);

    while i64::from(cursor.minutes_until(space.end)) > i64::from(duration_minutes) {
        slots.push(cursor);
        cursor = cursor.saturating_add(u32::from(SLOT_STEP_MINUTES));
    }

    slots
}
