//! Detect reservations that collide with a proposed appointment.
//!
//! Adjacent appointments (where one ends exactly when another starts) are NOT conflicts.

use chrono::NaiveDateTime;

use crate::reservation::ReservedInterval;

/// A reservation overlapping the proposed interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub reservation: ReservedInterval,
    pub overlap_minutes: i64,
}

/// Find every reservation that overlaps `[start, end)`.
///
/// Two intervals overlap when `a.start < b.end && b.start < a.end`.
/// The overlap duration is `min(a.end, b.end) - max(a.start, b.start)`.
pub fn find_conflicts(
    start: NaiveDateTime,
    end: NaiveDateTime,
    reserved: &[ReservedInterval],
) -> Vec<Conflict> {
    reserved
        .iter()
        .filter(|r| start < r.end && r.start < end)
        .map(|r| Conflict {
            reservation: r.clone(),
            overlap_minutes: (end.min(r.end) - start.max(r.start)).num_minutes(),
        })
        .collect()
}
