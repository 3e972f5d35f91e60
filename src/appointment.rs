//! Midwife appointments: directory, day picker, booking, cancellation
//! and the per-user appointment list.
//!
//! Booking is check-then-act against the document store: availability is
//! recomputed from a fresh read of the midwife document, then the slot is
//! appended to `bookedSlots` in a separate write. Two concurrent bookings of
//! the same slot can both pass the check.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::age::years_of_experience;
use crate::config;
use crate::core_state::CoreError;
use crate::db::{self, DataStore};
use crate::models::enums::{AppointmentStatus, StatusTab};
use crate::models::{Appointment, Midwife, Session};
use crate::slots::{self, DayOption, SessionFilter};

pub const CANCELLATION_REFUSED: &str =
    "Appointment is less than 24 hours away. Please contact the midwife directly to cancel.";

pub const NOT_CANCELLABLE: &str = "Only scheduled appointments can be cancelled.";

// ─── Directory ────────────────────────────────────────────────────────────────

/// Midwife card for the directory and profile screens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MidwifeSummary {
    pub id: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub province: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub years_of_experience: Option<u32>,
}

impl MidwifeSummary {
    pub fn from_midwife(m: &Midwife, today: NaiveDate) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            location: m.location.clone(),
            province: m.province.clone(),
            phone: m.phone.clone(),
            image: m.image.clone(),
            description: m.description.clone(),
            years_of_experience: m.joined_date.map(|d| years_of_experience(d, today)),
        }
    }
}

/// All midwives, optionally narrowed by a case-insensitive name search.
pub fn list_midwives(
    store: &dyn DataStore,
    query: Option<&str>,
    today: NaiveDate,
) -> Result<Vec<MidwifeSummary>, CoreError> {
    let needle = query.map(|q| q.trim().to_lowercase()).unwrap_or_default();
    let midwives = db::list_midwives(store)?;
    Ok(midwives
        .iter()
        .filter(|m| {
            needle.is_empty()
                || m.name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
        })
        .map(|m| MidwifeSummary::from_midwife(m, today))
        .collect())
}

fn load_midwife(store: &dyn DataStore, midwife_id: &str) -> Result<Midwife, CoreError> {
    db::get_midwife(store, midwife_id)?
        .ok_or_else(|| CoreError::NotFound(format!("Midwife {midwife_id}")))
}

pub fn midwife_profile(
    store: &dyn DataStore,
    midwife_id: &str,
    today: NaiveDate,
) -> Result<MidwifeSummary, CoreError> {
    let midwife = load_midwife(store, midwife_id)?;
    Ok(MidwifeSummary::from_midwife(&midwife, today))
}

/// Booking window for a midwife, starting today.
pub fn booking_days(
    store: &dyn DataStore,
    midwife_id: &str,
    today: NaiveDate,
) -> Result<Vec<DayOption>, CoreError> {
    let midwife = load_midwife(store, midwife_id)?;
    Ok(slots::next_n_days(
        today,
        config::BOOKING_WINDOW_DAYS,
        &midwife.sessions,
    ))
}

/// Free slots for one day, pooled across that day's sessions.
pub fn available_slots(
    store: &dyn DataStore,
    midwife_id: &str,
    date: NaiveDate,
    filter: &SessionFilter,
) -> Result<Vec<String>, CoreError> {
    let midwife = load_midwife(store, midwife_id)?;
    Ok(slots::pool_available_slots(&midwife.sessions, date, filter))
}

// ─── Booking ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub date: NaiveDate,
    pub time_slot: String,
    #[serde(flatten)]
    pub filter: SessionFilter,
}

/// Who the appointment is for.
#[derive(Debug, Clone)]
pub struct Booker {
    pub user_id: String,
    pub child_id: Option<String>,
}

/// Book a slot. The label must be in the freshly computed available set.
pub fn book_slot(
    store: &dyn DataStore,
    midwife_id: &str,
    request: &BookingRequest,
    booker: &Booker,
) -> Result<Appointment, CoreError> {
    let label = slots::parse_clock_time(&request.time_slot)
        .map(slots::format_slot_label)
        .ok_or_else(|| CoreError::Validation(format!("Invalid time slot: {}", request.time_slot)))?;

    let mut midwife = load_midwife(store, midwife_id)?;

    let index = midwife
        .sessions
        .iter()
        .position(|s| {
            s.date == Some(request.date)
                && request.filter.accepts(s)
                && slots::compute_available_slots(s).contains(&label)
        })
        .ok_or_else(|| {
            tracing::warn!(midwife_id, date = %request.date, label = %label, "Slot not available");
            CoreError::SlotUnavailable {
                date: request.date,
                label: label.clone(),
            }
        })?;

    let session = &mut midwife.sessions[index];
    session.booked_slots.push(label.clone());
    let session_type = session.session_type.clone();
    let location = session.location.clone();

    db::update_midwife_sessions(store, midwife_id, &midwife.sessions)?;

    let mut appointment = Appointment {
        id: String::new(),
        midwife_id: Some(midwife_id.to_string()),
        midwife_name: midwife.name.clone(),
        date: request.date,
        time_slot: label,
        session_type,
        location,
        status: AppointmentStatus::Scheduled,
        user: booker.user_id.clone(),
        child: booker.child_id.clone(),
    };
    appointment.id = db::insert_appointment(store, &appointment)?;

    tracing::info!(
        appointment_id = %appointment.id,
        midwife_id,
        date = %appointment.date,
        slot = %appointment.time_slot,
        "Appointment booked"
    );
    Ok(appointment)
}

// ─── Cancellation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CancelOutcome {
    Cancelled { appointment: Appointment },
    Refused { message: String },
}

fn load_own_appointment(
    store: &dyn DataStore,
    appointment_id: &str,
    user_id: &str,
) -> Result<Appointment, CoreError> {
    db::get_appointment(store, appointment_id)?
        .filter(|a| a.user == user_id)
        .ok_or_else(|| CoreError::NotFound(format!("Appointment {appointment_id}")))
}

pub fn get_appointment(
    store: &dyn DataStore,
    appointment_id: &str,
    user_id: &str,
) -> Result<Appointment, CoreError> {
    load_own_appointment(store, appointment_id, user_id)
}

/// Cancel a scheduled appointment at least 24 hours ahead of its slot.
///
/// Inside the lead time, or for a non-scheduled appointment, the request is
/// refused with an explanation. A successful cancel also frees the slot.
pub fn cancel_appointment(
    store: &dyn DataStore,
    appointment_id: &str,
    user_id: &str,
    now: NaiveDateTime,
) -> Result<CancelOutcome, CoreError> {
    let mut appointment = load_own_appointment(store, appointment_id, user_id)?;

    if appointment.status != AppointmentStatus::Scheduled {
        return Ok(CancelOutcome::Refused {
            message: NOT_CANCELLABLE.to_string(),
        });
    }

    let start = slots::slot_start(appointment.date, &appointment.time_slot).ok_or_else(|| {
        CoreError::Validation(format!(
            "Appointment has an unreadable time slot: {}",
            appointment.time_slot
        ))
    })?;

    if start - now < Duration::hours(config::CANCELLATION_LEAD_HOURS) {
        tracing::warn!(appointment_id, "Cancellation refused inside lead time");
        return Ok(CancelOutcome::Refused {
            message: CANCELLATION_REFUSED.to_string(),
        });
    }

    db::update_appointment_status(store, appointment_id, AppointmentStatus::Cancelled)?;
    appointment.status = AppointmentStatus::Cancelled;
    tracing::info!(appointment_id, "Appointment cancelled");

    if let Err(e) = release_slot(store, &appointment) {
        tracing::warn!(appointment_id, error = %e, "Failed to release booked slot");
    }

    Ok(CancelOutcome::Cancelled { appointment })
}

fn release_slot(store: &dyn DataStore, appointment: &Appointment) -> Result<(), CoreError> {
    let Some(midwife_id) = appointment.midwife_id.as_deref() else {
        return Ok(());
    };
    let Some(mut midwife) = db::get_midwife(store, midwife_id)? else {
        return Ok(());
    };

    let released = midwife
        .sessions
        .iter_mut()
        .filter(|s| s.date == Some(appointment.date))
        .find_map(|s: &mut Session| {
            let pos = s
                .booked_slots
                .iter()
                .position(|b| b == &appointment.time_slot)?;
            s.booked_slots.remove(pos);
            Some(())
        })
        .is_some();

    if released {
        db::update_midwife_sessions(store, midwife_id, &midwife.sessions)?;
    }
    Ok(())
}

// ─── Listing ──────────────────────────────────────────────────────────────────

/// A user's appointments under a tab, in date then slot order.
pub fn list_appointments(
    store: &dyn DataStore,
    user_id: &str,
    tab: StatusTab,
) -> Result<Vec<Appointment>, CoreError> {
    let mut appointments: Vec<Appointment> = db::list_user_appointments(store, user_id)?
        .into_iter()
        .filter(|a| match tab {
            StatusTab::All => true,
            StatusTab::Scheduled => a.status == AppointmentStatus::Scheduled,
            StatusTab::Completed => a.status == AppointmentStatus::Completed,
        })
        .collect();

    appointments.sort_by_key(|a| (a.date, slots::parse_clock_time(&a.time_slot)));
    Ok(appointments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteDocumentStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn session(d: NaiveDate, start: &str, end: &str, n: u32) -> Session {
        Session {
            date: Some(d),
            start_time: Some(start.into()),
            end_time: Some(end.into()),
            no_of_slots: Some(n),
            booked_slots: vec![],
            location: Some("Galle MOH".into()),
            session_type: Some("Clinic".into()),
        }
    }

    fn seed_midwife(store: &dyn DataStore) -> String {
        let midwife = Midwife {
            name: Some("Kumari Silva".into()),
            location: Some("Galle".into()),
            joined_date: Some(date(2012, 4, 1)),
            sessions: vec![
                session(date(2026, 11, 2), "9:00 AM", "11:00 AM", 2),
                session(date(2026, 11, 2), "2:00 PM", "3:00 PM", 1),
            ],
            ..Default::default()
        };
        db::insert_midwife(store, &midwife).unwrap()
    }

    fn booker() -> Booker {
        Booker {
            user_id: "u1".into(),
            child_id: Some("c1".into()),
        }
    }

    fn request(d: NaiveDate, slot: &str) -> BookingRequest {
        BookingRequest {
            date: d,
            time_slot: slot.into(),
            filter: SessionFilter::default(),
        }
    }

    #[test]
    fn booking_marks_slot_and_creates_appointment() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let id = seed_midwife(&store);

        let appt = book_slot(&store, &id, &request(date(2026, 11, 2), "10:00 AM"), &booker()).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.midwife_name.as_deref(), Some("Kumari Silva"));
        assert_eq!(appt.child.as_deref(), Some("c1"));

        let slots = available_slots(&store, &id, date(2026, 11, 2), &SessionFilter::default()).unwrap();
        assert_eq!(slots, vec!["9:00 AM", "2:00 PM"]);

        let stored = db::get_appointment(&store, &appt.id).unwrap().unwrap();
        assert_eq!(stored.time_slot, "10:00 AM");
    }

    #[test]
    fn padded_label_is_normalized() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let id = seed_midwife(&store);
        let appt = book_slot(&store, &id, &request(date(2026, 11, 2), "02:00 PM"), &booker()).unwrap();
        assert_eq!(appt.time_slot, "2:00 PM");
    }

    #[test]
    fn booked_slot_cannot_be_booked_twice() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let id = seed_midwife(&store);
        book_slot(&store, &id, &request(date(2026, 11, 2), "9:00 AM"), &booker()).unwrap();

        let err = book_slot(&store, &id, &request(date(2026, 11, 2), "9:00 AM"), &booker()).unwrap_err();
        assert!(matches!(err, CoreError::SlotUnavailable { .. }));
    }

    #[test]
    fn slot_outside_any_session_is_rejected() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let id = seed_midwife(&store);
        let err = book_slot(&store, &id, &request(date(2026, 11, 3), "9:00 AM"), &booker()).unwrap_err();
        assert!(matches!(err, CoreError::SlotUnavailable { .. }));
        let err = book_slot(&store, &id, &request(date(2026, 11, 2), "9:30 AM"), &booker()).unwrap_err();
        assert!(matches!(err, CoreError::SlotUnavailable { .. }));
        let err = book_slot(&store, &id, &request(date(2026, 11, 2), "later"), &booker()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn cancel_refused_inside_lead_time() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let id = seed_midwife(&store);
        let appt = book_slot(&store, &id, &request(date(2026, 11, 2), "10:00 AM"), &booker()).unwrap();

        // 23 hours before
        let now = date(2026, 11, 1).and_hms_opt(11, 0, 0).unwrap();
        let outcome = cancel_appointment(&store, &appt.id, "u1", now).unwrap();
        assert_eq!(
            outcome,
            CancelOutcome::Refused {
                message: CANCELLATION_REFUSED.to_string()
            }
        );
        let stored = db::get_appointment(&store, &appt.id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn cancel_exactly_at_lead_time_succeeds_and_frees_slot() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let id = seed_midwife(&store);
        let appt = book_slot(&store, &id, &request(date(2026, 11, 2), "10:00 AM"), &booker()).unwrap();

        let now = date(2026, 11, 1).and_hms_opt(10, 0, 0).unwrap();
        let outcome = cancel_appointment(&store, &appt.id, "u1", now).unwrap();
        assert!(matches!(outcome, CancelOutcome::Cancelled { .. }));

        let stored = db::get_appointment(&store, &appt.id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Cancelled);
        let slots = available_slots(&store, &id, date(2026, 11, 2), &SessionFilter::default()).unwrap();
        assert!(slots.contains(&"10:00 AM".to_string()));

        // second cancel is refused, not an error
        let again = cancel_appointment(&store, &appt.id, "u1", now).unwrap();
        assert_eq!(
            again,
            CancelOutcome::Refused {
                message: NOT_CANCELLABLE.to_string()
            }
        );
    }

    #[test]
    fn other_users_cannot_see_or_cancel() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let id = seed_midwife(&store);
        let appt = book_slot(&store, &id, &request(date(2026, 11, 2), "10:00 AM"), &booker()).unwrap();
        let now = date(2026, 10, 1).and_hms_opt(0, 0, 0).unwrap();
        assert!(matches!(
            cancel_appointment(&store, &appt.id, "intruder", now),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            get_appointment(&store, &appt.id, "intruder"),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn list_filters_by_tab_and_sorts() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let id = seed_midwife(&store);
        book_slot(&store, &id, &request(date(2026, 11, 2), "2:00 PM"), &booker()).unwrap();
        let first = book_slot(&store, &id, &request(date(2026, 11, 2), "9:00 AM"), &booker()).unwrap();
        db::update_appointment_status(&store, &first.id, AppointmentStatus::Completed).unwrap();

        let all = list_appointments(&store, "u1", StatusTab::All).unwrap();
        let slots: Vec<&str> = all.iter().map(|a| a.time_slot.as_str()).collect();
        assert_eq!(slots, vec!["9:00 AM", "2:00 PM"]);

        let completed = list_appointments(&store, "u1", StatusTab::Completed).unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, first.id);

        let scheduled = list_appointments(&store, "u1", StatusTab::Scheduled).unwrap();
        assert_eq!(scheduled[0].time_slot, "2:00 PM");

        assert!(list_appointments(&store, "u2", StatusTab::All).unwrap().is_empty());
    }

    #[test]
    fn directory_search_and_experience() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        seed_midwife(&store);
        db::insert_midwife(
            &store,
            &Midwife {
                name: Some("Nadeesha Fernando".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let today = date(2026, 10, 19);
        assert_eq!(list_midwives(&store, None, today).unwrap().len(), 2);

        let found = list_midwives(&store, Some("SILVA"), today).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].years_of_experience, Some(14));

        let nadeesha = &list_midwives(&store, Some("nadee"), today).unwrap()[0];
        assert_eq!(nadeesha.years_of_experience, None);
    }

    #[test]
    fn day_picker_covers_booking_window() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let id = seed_midwife(&store);
        let days = booking_days(&store, &id, date(2026, 10, 25)).unwrap();
        assert_eq!(days.len(), config::BOOKING_WINDOW_DAYS as usize);
        let selectable: Vec<NaiveDate> = days.iter().filter(|d| d.selectable).map(|d| d.date).collect();
        assert_eq!(selectable, vec![date(2026, 11, 2)]);
    }

    #[test]
    fn unknown_midwife_is_not_found() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        assert!(matches!(
            midwife_profile(&store, "ghost", date(2026, 1, 1)),
            Err(CoreError::NotFound(_))
        ));
    }
}
