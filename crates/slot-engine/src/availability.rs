//! Bookable start times for a provider on a calendar date.
//!
//! The computation runs in four stages:
//!
//! 1. split the working day around its breaks ([`spaces::split_by_breaks`]),
//! 2. split the remaining spaces around reservations ([`spaces::split_by_reservations`]),
//! 3. enumerate quarter-hour candidates that leave room for the service
//!    ([`slots::enumerate_slots`]),
//! 4. when the date is today, drop candidates that fall before `now` plus the
//!    advance-booking timeout.
//!
//! Everything here is a pure function of its arguments. "Now" is passed in by
//! the caller.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SlotError};
use crate::plan::{WorkingDay, WorkingPlan};
use crate::reservation::ReservedInterval;
use crate::slots;
use crate::spaces::{self, TimeSpace};
use crate::time::TimeOfDay;

/// Parameters of a single availability lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    /// Length of the requested service. Must be greater than zero.
    pub service_duration_minutes: u32,
    /// Editing an existing appointment rather than booking a new one.
    #[serde(default)]
    pub manage_mode: bool,
    /// Reservation to leave out of the busy set, typically the one being edited.
    #[serde(default)]
    pub excluded_reservation_id: Option<String>,
    /// Minimum lead time for same-day bookings. Ignored in manage mode.
    #[serde(default)]
    pub advance_timeout_minutes: u32,
    /// Provider-local current time.
    pub now: NaiveDateTime,
}

impl AvailabilityQuery {
    pub fn new(date: NaiveDate, service_duration_minutes: u32, now: NaiveDateTime) -> Self {
        Self {
            date,
            service_duration_minutes,
            manage_mode: false,
            excluded_reservation_id: None,
            advance_timeout_minutes: 0,
            now,
        }
    }

    pub fn with_advance_timeout(mut self, minutes: u32) -> Self {
        self.advance_timeout_minutes = minutes;
        self
    }

    /// Switch to manage mode, leaving `reservation_id` out of the busy set.
    pub fn managing(mut self, reservation_id: impl Into<String>) -> Self {
        self.manage_mode = true;
        self.excluded_reservation_id = Some(reservation_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.service_duration_minutes == 0 {
            return Err(SlotError::Validation(
                "service duration must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Lead time actually applied: zero in manage mode.
    pub fn effective_advance_timeout(&self) -> u32 {
        if self.manage_mode {
            0
        } else {
            self.advance_timeout_minutes
        }
    }
}

/// Ordered list of bookable start times.
///
/// Serializes as a plain JSON array of `"HH:MM"` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailableHours(pub Vec<TimeOfDay>);

impl AvailableHours {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, time: TimeOfDay) -> bool {
        self.0.binary_search(&time).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeOfDay> {
        self.0.iter()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(TimeOfDay::to_string).collect()
    }
}

impl IntoIterator for AvailableHours {
    type Item = TimeOfDay;
    type IntoIter = std::vec::IntoIter<TimeOfDay>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Busy intervals on `query.date`, minus the excluded reservation.
fn busy_intervals(
    reserved: &[ReservedInterval],
    query: &AvailabilityQuery,
) -> Result<Vec<(TimeOfDay, TimeOfDay)>> {
    let mut busy = Vec::with_capacity(reserved.len());
    for r in reserved {
        if query.excluded_reservation_id.as_deref() == Some(r.id.as_str()) {
            continue;
        }
        r.validate()?;
        if let Some(interval) = r.clip_to(query.date) {
            busy.push(interval);
        }
    }
    Ok(busy)
}

/// Free spaces of a working day once breaks and reservations are removed.
///
/// Sorted by start time, without duplicates.
///
/// # Errors
/// Returns `SlotError::Validation` for a malformed day, break or reservation.
pub fn free_spaces(
    working_day: &WorkingDay,
    reserved: &[ReservedInterval],
    query: &AvailabilityQuery,
) -> Result<Vec<TimeSpace>> {
    working_day.validate()?;

    let around_breaks = spaces::split_by_breaks(working_day);
    let busy = busy_intervals(reserved, query)?;
    let free = spaces::split_by_reservations(&around_breaks, &busy);

    debug!(
        date = %query.date,
        breaks = working_day.breaks.len(),
        reservations = busy.len(),
        spaces_after_breaks = around_breaks.len(),
        spaces_after_reservations = free.len(),
        "computed free spaces"
    );

    Ok(free)
}

/// Drop candidates at or before `now + timeout` when `query.date` is today.
fn drop_past_hours(candidates: &mut Vec<TimeOfDay>, query: &AvailabilityQuery) {
    if query.date != query.now.date() {
        return;
    }
    let cutoff = query.now + Duration::minutes(i64::from(query.effective_advance_timeout()));
    candidates.retain(|slot| slot.on(query.date) > cutoff);
}

/// Compute the bookable start times for one working day.
///
/// The result is sorted ascending and deduplicated. Every returned slot,
/// extended by the service duration, lies inside the working day, outside
/// every break and outside every reservation (other than the excluded one).
///
/// # Errors
/// Returns `SlotError::Validation` for a zero service duration or a malformed
/// day, break or reservation.
pub fn compute_available_hours(
    working_day: &WorkingDay,
    reserved: &[ReservedInterval],
    query: &AvailabilityQuery,
) -> Result<AvailableHours> {
    query.validate()?;

    let free = free_spaces(working_day, reserved, query)?;

    let mut candidates: Vec<TimeOfDay> = free
        .iter()
        .flat_map(|space| slots::enumerate_slots(space, query.service_duration_minutes))
        .collect();
    candidates.sort_unstable();
    candidates.dedup();
    let enumerated = candidates.len();

    drop_past_hours(&mut candidates, query);

    debug!(
        date = %query.date,
        duration = query.service_duration_minutes,
        candidates = enumerated,
        available = candidates.len(),
        "computed available hours"
    );

    Ok(AvailableHours(candidates))
}

/// Look up the working day for `query.date` and compute its available hours.
///
/// A day off yields an empty result, not an error.
pub fn available_hours_for_plan(
    plan: &WorkingPlan,
    reserved: &[ReservedInterval],
    query: &AvailabilityQuery,
) -> Result<AvailableHours> {
    query.validate()?;

    match plan.for_date(query.date) {
        Some(day) => compute_available_hours(day, reserved, query),
        None => {
            debug!(date = %query.date, "provider does not work on this day");
            Ok(AvailableHours::default())
        }
    }
}
