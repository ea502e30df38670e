//! Request-level booking flow.
//!
//! [`BookingService`] gathers the inputs of the availability engine from the
//! collaborators in [`crate::store`], and registers or cancels appointments.
//! Calendar mirroring is best-effort: a sync failure is logged and the booking
//! stands.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::availability::{available_hours_for_plan, AvailabilityQuery, AvailableHours};
use crate::conflict::find_conflicts;
use crate::error::{Result, SlotError};
use crate::plan::WorkingPlan;
use crate::reservation::ReservedInterval;
use crate::store::{AppointmentStore, CalendarSync, ProviderSettingsStore};
use crate::time::TimeOfDay;

/// Input of an available-hours lookup, as posted by the booking page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableHoursRequest {
    pub provider_id: String,
    pub selected_date: NaiveDate,
    pub service_duration: u32,
    #[serde(default)]
    pub manage_mode: bool,
    /// The appointment being edited when `manage_mode` is set.
    #[serde(default)]
    pub appointment_id: Option<String>,
}

/// Input of a booking: a new appointment, or a reschedule when `appointment_id` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub provider_id: String,
    pub start: NaiveDateTime,
    pub service_duration: u32,
    #[serde(default)]
    pub appointment_id: Option<String>,
}

pub struct BookingService {
    settings: Arc<dyn ProviderSettingsStore>,
    appointments: Arc<dyn AppointmentStore>,
    calendar: Option<Arc<dyn CalendarSync>>,
}

impl BookingService {
    pub fn new(
        settings: Arc<dyn ProviderSettingsStore>,
        appointments: Arc<dyn AppointmentStore>,
    ) -> Self {
        Self {
            settings,
            appointments,
            calendar: None,
        }
    }

    pub fn with_calendar_sync(mut self, calendar: Arc<dyn CalendarSync>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    /// Available start times for a provider on a date.
    ///
    /// In manage mode the edited appointment does not block its own slot and
    /// the advance-booking timeout is waived.
    pub fn available_hours(
        &self,
        request: &AvailableHoursRequest,
        now: NaiveDateTime,
    ) -> Result<AvailableHours> {
        let exclude = if request.manage_mode {
            request.appointment_id.as_deref()
        } else {
            None
        };
        let (hours, _) = self.lookup(
            &request.provider_id,
            request.selected_date,
            request.service_duration,
            request.manage_mode,
            exclude,
            now,
        )?;
        Ok(hours)
    }

    /// Register an appointment, or move an existing one.
    ///
    /// The store repeats the overlap check atomically with the write, so
    /// concurrent bookings of the same hour cannot both succeed.
    ///
    /// # Errors
    /// Returns `SlotError::Conflict` if the requested start is not currently
    /// available or the appointment would overlap another reservation, and
    /// `SlotError::NotFound` when rescheduling an appointment the provider
    /// does not own.
    pub fn book(&self, request: &BookingRequest, now: NaiveDateTime) -> Result<ReservedInterval> {
        if let Some(id) = &request.appointment_id {
            let owner = self.appointments.owner(id)?;
            if owner.as_deref() != Some(request.provider_id.as_str()) {
                return Err(SlotError::NotFound(format!(
                    "appointment {} of provider {}",
                    id, request.provider_id
                )));
            }
        }

        let date = request.start.date();
        let manage_mode = request.appointment_id.is_some();
        let (hours, reserved) = self.lookup(
            &request.provider_id,
            date,
            request.service_duration,
            manage_mode,
            request.appointment_id.as_deref(),
            now,
        )?;

        let slot = TimeOfDay::from(request.start.time());
        if request.start.second() != 0 || !hours.contains(slot) {
            return Err(SlotError::Conflict(format!(
                "{} is not an available hour for provider {}",
                request.start, request.provider_id
            )));
        }

        let end = request.start + Duration::minutes(i64::from(request.service_duration));
        let others: Vec<ReservedInterval> = reserved
            .into_iter()
            .filter(|r| request.appointment_id.as_deref() != Some(r.id.as_str()))
            .collect();
        if let Some(conflict) = find_conflicts(request.start, end, &others).first() {
            return Err(SlotError::Conflict(format!(
                "overlaps appointment {} by {} minutes",
                conflict.reservation.id, conflict.overlap_minutes
            )));
        }

        let appointment = match &request.appointment_id {
            Some(id) => {
                let moved = ReservedInterval::new(id.clone(), request.start, end);
                self.appointments
                    .update_if_free(&request.provider_id, &moved)?;
                self.sync(&request.provider_id, &moved, |c, p, a| c.update_appointment(p, a));
                moved
            }
            None => {
                let created = self
                    .appointments
                    .insert_if_free(&request.provider_id, request.start, end)?;
                self.sync(&request.provider_id, &created, |c, p, a| c.add_appointment(p, a));
                created
            }
        };

        info!(
            provider_id = %request.provider_id,
            appointment_id = %appointment.id,
            start = %appointment.start,
            end = %appointment.end,
            rescheduled = manage_mode,
            "appointment booked"
        );
        Ok(appointment)
    }

    /// Cancel an appointment by id.
    ///
    /// # Errors
    /// Returns `SlotError::NotFound` if no appointment has that id.
    pub fn cancel(&self, appointment_id: &str) -> Result<ReservedInterval> {
        let (provider_id, removed) = self
            .appointments
            .remove(appointment_id)?
            .ok_or_else(|| SlotError::NotFound(format!("appointment {}", appointment_id)))?;

        self.sync(&provider_id, &removed, |c, p, a| c.delete_appointment(p, a));

        info!(%provider_id, appointment_id, "appointment cancelled");
        Ok(removed)
    }

    fn lookup(
        &self,
        provider_id: &str,
        date: NaiveDate,
        service_duration: u32,
        manage_mode: bool,
        exclude: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<(AvailableHours, Vec<ReservedInterval>)> {
        let plan = WorkingPlan::from_json(&self.settings.working_plan(provider_id)?)?;
        let reserved = self.appointments.reserved_intervals(provider_id, date)?;
        let advance_timeout = if manage_mode {
            0
        } else {
            self.settings.advance_timeout()?
        };

        let query = AvailabilityQuery {
            date,
            service_duration_minutes: service_duration,
            manage_mode,
            excluded_reservation_id: exclude.map(str::to_string),
            advance_timeout_minutes: advance_timeout,
            now,
        };
        let hours = available_hours_for_plan(&plan, &reserved, &query)?;
        Ok((hours, reserved))
    }

    fn sync<F>(&self, provider_id: &str, appointment: &ReservedInterval, op: F)
    where
        F: FnOnce(&dyn CalendarSync, &str, &ReservedInterval) -> Result<()>,
    {
        let Some(calendar) = &self.calendar else {
            return;
        };
        if let Err(e) = op(calendar.as_ref(), provider_id, appointment) {
            warn!(
                provider_id,
                appointment_id = %appointment.id,
                error = %e,
                "calendar sync failed"
            );
        }
    }
}
