//! Tests for the request-level flow: available-hours lookup, booking, cancellation.

use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use slot_engine::store::{AppointmentStore, CalendarSync, InMemoryStore};
use slot_engine::{
    AvailableHoursRequest, BookingRequest, BookingService, ReservedInterval, SlotError,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

const PLAN: &str = r#"{
    "monday": {"start": "09:00", "end": "17:00", "breaks": [{"start": "12:00", "end": "13:00"}]},
    "tuesday": {"start": "09:00", "end": "12:00"},
    "sunday": null
}"#;

fn dt(s: &str) -> NaiveDateTime {
    s.parse().unwrap()
}

/// Monday 2026-03-16.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 16).unwrap()
}

fn sunday_noon() -> NaiveDateTime {
    dt("2026-03-15T12:00:00")
}

fn store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.set_working_plan("p1", PLAN);
    store
}

fn service(store: &Arc<InMemoryStore>) -> BookingService {
    BookingService::new(store.clone(), store.clone())
}

fn hours_request(date: NaiveDate, duration: u32) -> AvailableHoursRequest {
    AvailableHoursRequest {
        provider_id: "p1".to_string(),
        selected_date: date,
        service_duration: duration,
        manage_mode: false,
        appointment_id: None,
    }
}

fn booking(start: &str, duration: u32) -> BookingRequest {
    BookingRequest {
        provider_id: "p1".to_string(),
        start: dt(start),
        service_duration: duration,
        appointment_id: None,
    }
}

/// Records every sync call and optionally fails them all.
#[derive(Default)]
struct RecordingSync {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingSync {
    fn record(&self, op: &str, appointment: &ReservedInterval) -> slot_engine::error::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", op, appointment.id));
        if self.fail {
            Err(SlotError::Upstream("calendar unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl CalendarSync for RecordingSync {
    fn add_appointment(&self, _: &str, a: &ReservedInterval) -> slot_engine::error::Result<()> {
        self.record("add", a)
    }

    fn update_appointment(&self, _: &str, a: &ReservedInterval) -> slot_engine::error::Result<()> {
        self.record("update", a)
    }

    fn delete_appointment(&self, _: &str, a: &ReservedInterval) -> slot_engine::error::Result<()> {
        self.record("delete", a)
    }
}

// ── Available hours ─────────────────────────────────────────────────────────

#[test]
fn lookup_reads_plan_and_reservations() {
    let store = store();
    store.add_reservation(
        "p1",
        ReservedInterval::new("a", dt("2026-03-16T10:00:00"), dt("2026-03-16T10:30:00")),
    );
    // Another provider's appointment does not block p1.
    store.add_reservation(
        "p2",
        ReservedInterval::new("b", dt("2026-03-16T09:00:00"), dt("2026-03-16T12:00:00")),
    );

    let hours = service(&store)
        .available_hours(&hours_request(monday(), 30), sunday_noon())
        .unwrap();

    let labels = hours.to_strings();
    assert_eq!(&labels[..6], ["09:00", "09:15", "10:30", "10:45", "11:00", "11:15"]);
    assert_eq!(labels[6], "13:00");
    assert_eq!(labels.last().map(String::as_str), Some("16:15"));
}

#[test]
fn same_day_lookup_uses_stored_advance_timeout() {
    let store = store();
    store.set_advance_timeout(30);

    let hours = service(&store)
        .available_hours(&hours_request(monday(), 30), dt("2026-03-16T14:50:00"))
        .unwrap();

    assert_eq!(hours.to_strings(), ["15:30", "15:45", "16:00", "16:15"]);
}

#[test]
fn manage_mode_excludes_edited_appointment_and_timeout() {
    let store = store();
    store.set_advance_timeout(120);
    store.add_reservation(
        "p1",
        ReservedInterval::new("7", dt("2026-03-16T15:30:00"), dt("2026-03-16T16:00:00")),
    );

    let mut request = hours_request(monday(), 30);
    request.manage_mode = true;
    request.appointment_id = Some("7".to_string());

    let hours = service(&store)
        .available_hours(&request, dt("2026-03-16T14:50:00"))
        .unwrap();

    assert_eq!(
        hours.to_strings(),
        ["15:00", "15:15", "15:30", "15:45", "16:00", "16:15"]
    );
}

#[test]
fn day_off_is_empty_not_an_error() {
    let store = store();
    let sunday = NaiveDate::from_ymd_opt(2026, 3, 22).unwrap();

    let hours = service(&store)
        .available_hours(&hours_request(sunday, 30), sunday_noon())
        .unwrap();

    assert!(hours.is_empty());
}

#[test]
fn unknown_provider_is_upstream_error() {
    let store = store();
    let mut request = hours_request(monday(), 30);
    request.provider_id = "nobody".to_string();

    let result = service(&store).available_hours(&request, sunday_noon());

    assert!(matches!(result, Err(SlotError::Upstream(_))));
}

#[test]
fn corrupt_plan_is_reported() {
    let store = store();
    store.set_working_plan("p1", "{not json");

    let result = service(&store).available_hours(&hours_request(monday(), 30), sunday_noon());

    assert!(matches!(result, Err(SlotError::InvalidPlan(_))));
}

// ── Booking ─────────────────────────────────────────────────────────────────

#[test]
fn booking_an_available_hour_stores_it() {
    let store = store();
    let service = service(&store);

    let booked = service
        .book(&booking("2026-03-16T10:00:00", 30), sunday_noon())
        .unwrap();

    assert_eq!(booked.end, dt("2026-03-16T10:30:00"));
    assert_eq!(store.appointment_count(), 1);

    // The booked hour is no longer offered.
    let hours = service
        .available_hours(&hours_request(monday(), 30), sunday_noon())
        .unwrap();
    assert!(!hours.to_strings().contains(&"10:00".to_string()));
}

#[test]
fn booking_a_taken_hour_conflicts() {
    let store = store();
    let service = service(&store);
    service
        .book(&booking("2026-03-16T10:00:00", 60), sunday_noon())
        .unwrap();

    let result = service.book(&booking("2026-03-16T10:30:00", 30), sunday_noon());

    assert!(matches!(result, Err(SlotError::Conflict(_))));
    assert_eq!(store.appointment_count(), 1);
}

#[test]
fn booking_off_the_quarter_grid_conflicts() {
    let store = store();
    let result = service(&store).book(&booking("2026-03-16T10:05:00", 30), sunday_noon());
    assert!(matches!(result, Err(SlotError::Conflict(_))));
}

#[test]
fn booking_into_a_break_conflicts() {
    let store = store();
    let result = service(&store).book(&booking("2026-03-16T11:45:00", 30), sunday_noon());
    assert!(matches!(result, Err(SlotError::Conflict(_))));
}

#[test]
fn rescheduling_moves_the_appointment() {
    let store = store();
    let service = service(&store);
    let first = service
        .book(&booking("2026-03-16T10:00:00", 30), sunday_noon())
        .unwrap();

    // Moving by 15 minutes overlaps the first interval, which must not block itself.
    let mut request = booking("2026-03-16T10:15:00", 30);
    request.appointment_id = Some(first.id.clone());
    let moved = service.book(&request, sunday_noon()).unwrap();

    assert_eq!(moved.id, first.id);
    assert_eq!(moved.start, dt("2026-03-16T10:15:00"));
    assert_eq!(store.appointment_count(), 1);

    let stored = store.reserved_intervals("p1", monday()).unwrap();
    assert_eq!(stored, vec![moved]);
}

#[test]
fn rescheduling_unknown_appointment_is_not_found() {
    let store = store();
    let mut request = booking("2026-03-16T10:00:00", 30);
    request.appointment_id = Some("missing".to_string());

    let result = service(&store).book(&request, sunday_noon());

    assert!(matches!(result, Err(SlotError::NotFound(_))));
}

#[test]
fn rescheduling_under_another_provider_is_not_found() {
    let store = store();
    store.set_working_plan("p2", PLAN);
    store.add_reservation(
        "p1",
        ReservedInterval::new("a", dt("2026-03-16T09:00:00"), dt("2026-03-16T09:30:00")),
    );
    store.add_reservation(
        "p1",
        ReservedInterval::new("b", dt("2026-03-16T10:00:00"), dt("2026-03-16T11:00:00")),
    );

    // p2's calendar is empty, so 10:00 looks free there but is taken by "b" for p1.
    let mut request = booking("2026-03-16T10:00:00", 30);
    request.provider_id = "p2".to_string();
    request.appointment_id = Some("a".to_string());
    let result = service(&store).book(&request, sunday_noon());

    assert!(matches!(result, Err(SlotError::NotFound(_))));
    let stored = store.reserved_intervals("p1", monday()).unwrap();
    assert_eq!(stored[0].start, dt("2026-03-16T09:00:00"), "appointment a must not move");
}

#[test]
fn store_rejects_overlapping_writes() {
    let store = store();
    let kept = store
        .insert_if_free("p1", dt("2026-03-16T10:00:00"), dt("2026-03-16T11:00:00"))
        .unwrap();
    let other = store
        .insert_if_free("p1", dt("2026-03-16T11:00:00"), dt("2026-03-16T11:30:00"))
        .unwrap();

    let clash = store.insert_if_free("p1", dt("2026-03-16T10:30:00"), dt("2026-03-16T11:00:00"));
    assert!(matches!(clash, Err(SlotError::Conflict(_))));

    let moved = ReservedInterval::new(other.id.clone(), dt("2026-03-16T10:45:00"), dt("2026-03-16T11:15:00"));
    assert!(matches!(store.update_if_free("p1", &moved), Err(SlotError::Conflict(_))));

    // Another provider's calendar is independent.
    assert!(store
        .insert_if_free("p2", dt("2026-03-16T10:00:00"), dt("2026-03-16T11:00:00"))
        .is_ok());
    assert!(matches!(store.update_if_free("p2", &kept), Err(SlotError::NotFound(_))));
    assert_eq!(store.appointment_count(), 3);
}

/// Appointment store whose reads are slow, widening the gap between the
/// availability check and the write.
struct SlowReads(Arc<InMemoryStore>);

impl AppointmentStore for SlowReads {
    fn reserved_intervals(
        &self,
        provider_id: &str,
        date: NaiveDate,
    ) -> slot_engine::error::Result<Vec<ReservedInterval>> {
        let found = self.0.reserved_intervals(provider_id, date);
        thread::sleep(Duration::from_millis(100));
        found
    }

    fn owner(&self, id: &str) -> slot_engine::error::Result<Option<String>> {
        self.0.owner(id)
    }

    fn insert_if_free(
        &self,
        provider_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> slot_engine::error::Result<ReservedInterval> {
        self.0.insert_if_free(provider_id, start, end)
    }

    fn update_if_free(
        &self,
        provider_id: &str,
        appointment: &ReservedInterval,
    ) -> slot_engine::error::Result<()> {
        self.0.update_if_free(provider_id, appointment)
    }

    fn remove(&self, id: &str) -> slot_engine::error::Result<Option<(String, ReservedInterval)>> {
        self.0.remove(id)
    }
}

#[test]
fn concurrent_bookings_of_one_hour_store_only_one() {
    let store = store();
    let service = BookingService::new(store.clone(), Arc::new(SlowReads(store.clone())));
    let barrier = Barrier::new(2);
    let (barrier, service) = (&barrier, &service);

    let results: Vec<bool> = thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(move || {
                    barrier.wait();
                    match service.book(&booking("2026-03-16T10:00:00", 30), sunday_noon()) {
                        Ok(_) => true,
                        Err(SlotError::Conflict(_)) => false,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|ok| **ok).count(), 1, "results: {:?}", results);
    assert_eq!(store.appointment_count(), 1);
}

// ── Cancellation ────────────────────────────────────────────────────────────

#[test]
fn cancel_frees_the_hour() {
    let store = store();
    let service = service(&store);
    let booked = service
        .book(&booking("2026-03-16T10:00:00", 30), sunday_noon())
        .unwrap();

    let cancelled = service.cancel(&booked.id).unwrap();

    assert_eq!(cancelled, booked);
    assert_eq!(store.appointment_count(), 0);
}

#[test]
fn cancel_unknown_is_not_found() {
    let store = store();
    let result = service(&store).cancel("missing");
    assert!(matches!(result, Err(SlotError::NotFound(_))));
}

// ── Calendar sync ───────────────────────────────────────────────────────────

#[test]
fn calendar_sync_mirrors_each_change() {
    let store = store();
    let sync = Arc::new(RecordingSync::default());
    let service = service(&store).with_calendar_sync(sync.clone());

    let booked = service
        .book(&booking("2026-03-16T09:00:00", 30), sunday_noon())
        .unwrap();
    let mut request = booking("2026-03-16T14:00:00", 30);
    request.appointment_id = Some(booked.id.clone());
    service.book(&request, sunday_noon()).unwrap();
    service.cancel(&booked.id).unwrap();

    let calls = sync.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            format!("add {}", booked.id),
            format!("update {}", booked.id),
            format!("delete {}", booked.id),
        ]
    );
}

#[test]
fn calendar_sync_failure_does_not_undo_booking() {
    let store = store();
    let sync = Arc::new(RecordingSync {
        fail: true,
        ..RecordingSync::default()
    });
    let service = service(&store).with_calendar_sync(sync.clone());

    let booked = service.book(&booking("2026-03-16T09:00:00", 30), sunday_noon());

    assert!(booked.is_ok(), "sync failure must not fail the booking");
    assert_eq!(store.appointment_count(), 1);
    assert_eq!(sync.calls.lock().unwrap().len(), 1);
}
