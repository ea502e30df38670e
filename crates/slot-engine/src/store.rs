//! Collaborators consulted by the booking flow.
//!
//! The engine itself never performs I/O. Provider settings, stored appointments
//! and external calendar mirroring sit behind these traits; implementations
//! report their failures as [`SlotError::Upstream`].

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::RwLock;

use crate::conflict::find_conflicts;
use crate::error::{Result, SlotError};
use crate::reservation::ReservedInterval;

/// Provider settings: working plans and the global advance-booking timeout.
pub trait ProviderSettingsStore: Send + Sync {
    /// The provider's working plan, serialized as JSON.
    fn working_plan(&self, provider_id: &str) -> Result<String>;

    /// Minimum lead time in minutes for same-day bookings.
    fn advance_timeout(&self) -> Result<u32>;
}

/// Persistent appointments.
pub trait AppointmentStore: Send + Sync {
    /// Appointments of `provider_id` touching `date`, ordered by start time.
    fn reserved_intervals(&self, provider_id: &str, date: NaiveDate)
        -> Result<Vec<ReservedInterval>>;

    /// Provider owning the appointment `id`, if it exists.
    fn owner(&self, id: &str) -> Result<Option<String>>;

    /// Store a new appointment and return it with its assigned id.
    ///
    /// The overlap check and the write form one atomic step: returns
    /// `SlotError::Conflict` if `[start, end)` overlaps any appointment of
    /// `provider_id`.
    fn insert_if_free(
        &self,
        provider_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<ReservedInterval>;

    /// Replace the times of an existing appointment of `provider_id`.
    ///
    /// Atomic like [`AppointmentStore::insert_if_free`]. Returns
    /// `SlotError::NotFound` if `provider_id` has no appointment with that id,
    /// and `SlotError::Conflict` if the new times overlap another of its
    /// appointments.
    fn update_if_free(&self, provider_id: &str, appointment: &ReservedInterval) -> Result<()>;

    /// Delete an appointment, returning its owner and the removed record.
    fn remove(&self, id: &str) -> Result<Option<(String, ReservedInterval)>>;
}

/// Best-effort mirroring of appointments into an external calendar.
///
/// Failures are logged by the caller and never undo a booking.
pub trait CalendarSync: Send + Sync {
    fn add_appointment(&self, provider_id: &str, appointment: &ReservedInterval) -> Result<()>;

    fn update_appointment(&self, provider_id: &str, appointment: &ReservedInterval)
        -> Result<()>;

    fn delete_appointment(&self, provider_id: &str, appointment: &ReservedInterval)
        -> Result<()>;
}

#[derive(Debug, Default)]
struct Inner {
    plans: HashMap<String, String>,
    advance_timeout: u32,
    appointments: Vec<(String, ReservedInterval)>,
    next_id: u64,
}

impl Inner {
    /// Fails with `SlotError::Conflict` if `[start, end)` overlaps an
    /// appointment of `provider_id` other than `skip`.
    fn ensure_free(
        &self,
        provider_id: &str,
        skip: Option<&str>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<()> {
        let others: Vec<ReservedInterval> = self
            .appointments
            .iter()
            .filter(|(owner, a)| owner == provider_id && skip != Some(a.id.as_str()))
            .map(|(_, a)| a.clone())
            .collect();
        match find_conflicts(start, end, &others).first() {
            Some(conflict) => Err(SlotError::Conflict(format!(
                "overlaps appointment {} by {} minutes",
                conflict.reservation.id, conflict.overlap_minutes
            ))),
            None => Ok(()),
        }
    }
}

/// Thread-safe in-memory implementation of both stores.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_working_plan(&self, provider_id: impl Into<String>, plan_json: impl Into<String>) {
        self.inner
            .write()
            .plans
            .insert(provider_id.into(), plan_json.into());
    }

    pub fn set_advance_timeout(&self, minutes: u32) {
        self.inner.write().advance_timeout = minutes;
    }

    /// Seed an appointment with a caller-chosen id.
    pub fn add_reservation(&self, provider_id: impl Into<String>, appointment: ReservedInterval) {
        self.inner
            .write()
            .appointments
            .push((provider_id.into(), appointment));
    }

    pub fn appointment_count(&self) -> usize {
        self.inner.read().appointments.len()
    }
}

impl ProviderSettingsStore for InMemoryStore {
    fn working_plan(&self, provider_id: &str) -> Result<String> {
        self.inner
            .read()
            .plans
            .get(provider_id)
            .cloned()
            .ok_or_else(|| {
                SlotError::Upstream(format!("no working plan stored for provider {}", provider_id))
            })
    }

    fn advance_timeout(&self) -> Result<u32> {
        Ok(self.inner.read().advance_timeout)
    }
}

impl AppointmentStore for InMemoryStore {
    fn reserved_intervals(
        &self,
        provider_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<ReservedInterval>> {
        let mut found: Vec<ReservedInterval> = self
            .inner
            .read()
            .appointments
            .iter()
            .filter(|(owner, a)| owner == provider_id && a.clip_to(date).is_some())
            .map(|(_, a)| a.clone())
            .collect();
        found.sort_by_key(|a| (a.start, a.end));
        Ok(found)
    }

    fn owner(&self, id: &str) -> Result<Option<String>> {
        Ok(self
            .inner
            .read()
            .appointments
            .iter()
            .find(|(_, a)| a.id == id)
            .map(|(owner, _)| owner.clone()))
    }

    fn insert_if_free(
        &self,
        provider_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<ReservedInterval> {
        let mut inner = self.inner.write();
        inner.ensure_free(provider_id, None, start, end)?;
        let id = loop {
            inner.next_id += 1;
            let candidate = inner.next_id.to_string();
            if !inner.appointments.iter().any(|(_, a)| a.id == candidate) {
                break candidate;
            }
        };
        let appointment = ReservedInterval::new(id, start, end);
        inner
            .appointments
            .push((provider_id.to_string(), appointment.clone()));
        Ok(appointment)
    }

    fn update_if_free(&self, provider_id: &str, appointment: &ReservedInterval) -> Result<()> {
        let mut inner = self.inner.write();
        let index = inner
            .appointments
            .iter()
            .position(|(owner, a)| owner == provider_id && a.id == appointment.id)
            .ok_or_else(|| {
                SlotError::NotFound(format!(
                    "appointment {} of provider {}",
                    appointment.id, provider_id
                ))
            })?;
        inner.ensure_free(
            provider_id,
            Some(&appointment.id),
            appointment.start,
            appointment.end,
        )?;
        inner.appointments[index].1 = appointment.clone();
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<Option<(String, ReservedInterval)>> {
        let mut inner = self.inner.write();
        let removed = inner
            .appointments
            .iter()
            .position(|(_, a)| a.id == id)
            .map(|index| inner.appointments.remove(index));
        Ok(removed)
    }
}
