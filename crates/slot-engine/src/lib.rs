//! # slot-engine
//!
//! Deterministic appointment availability for booking front ends.
//!
//! Given a provider's weekly working plan, the breaks of each working day, the
//! appointments already reserved and the length of the requested service, the
//! engine computes the quarter-hour start times that can still be booked on a
//! calendar date. Same-day lookups honour an advance-booking timeout.
//!
//! The engine is a pure function: no clock, no I/O, no shared state. The
//! surrounding [`booking`] flow fetches its inputs through the traits in
//! [`store`].
//!
//! ## Modules
//!
//! - [`time`]: `TimeOfDay`, minute-precision `HH:MM` values
//! - [`plan`]: Weekly working plans, working days and breaks
//! - [`reservation`]: Existing appointments
//! - [`spaces`]: Split a working day around breaks and reservations
//! - [`slots`]: Quarter-hour quantization of free spaces
//! - [`availability`]: Query type and `compute_available_hours`
//! - [`conflict`]: Overlap detection for a proposed appointment
//! - [`store`]: Collaborator traits and an in-memory implementation
//! - [`booking`]: Available-hours lookup, booking and cancellation
//! - [`error`]: Error types

pub mod availability;
pub mod booking;
pub mod conflict;
pub mod error;
pub mod plan;
pub mod reservation;
pub mod slots;
pub mod spaces;
pub mod store;
pub mod time;

pub use availability::{
    available_hours_for_plan, compute_available_hours, free_spaces, AvailabilityQuery,
    AvailableHours,
};
pub use booking::{AvailableHoursRequest, BookingRequest, BookingService};
pub use conflict::find_conflicts;
pub use error::SlotError;
pub use plan::{BreakInterval, WorkingDay, WorkingPlan};
pub use reservation::ReservedInterval;
pub use spaces::TimeSpace;
pub use time::TimeOfDay;
