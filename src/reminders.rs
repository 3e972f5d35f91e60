//! Vaccination reminders: sessions a child is invited to that still await a
//! response, and the two responses (confirm / reschedule).
//!
//! A reminder disappears once any record exists for its
//! `(vaccinationSessionId, childId)` pair, whatever that record's status.
//! Responses append records; nothing here updates or deletes one.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::core_state::CoreError;
use crate::db::{self, DataStore};
use crate::models::enums::RecordStatus;
use crate::models::{VaccinationRecord, VaccinationSession, VaccineSchedule};
use crate::notifications::{LocalNotification, Notifier};

pub const UNKNOWN_VACCINE: &str = "Unknown Vaccine";
pub const RESCHEDULE_REASON_REQUIRED: &str = "Please provide a reason for rescheduling.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub session_id: String,
    pub vaccine_id: Option<String>,
    pub vaccine_name: String,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub description: String,
    pub location: Option<String>,
    pub notification_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub reason: String,
}

fn describe(session: &VaccinationSession) -> String {
    let part = |v: &Option<String>| v.clone().unwrap_or_default();
    format!(
        "Vaccination at {},{} starting from {} to {}",
        part(&session.selected_center),
        part(&session.selected_area),
        part(&session.start_time),
        part(&session.end_time),
    )
}

/// Outstanding reminders for `child_id`, in session fetch order.
///
/// `notification_enabled` is left false; `load_reminders` fills it in.
pub fn compute_reminders(
    sessions: &[VaccinationSession],
    records: &[VaccinationRecord],
    schedule: &[VaccineSchedule],
    child_id: &str,
) -> Vec<Reminder> {
    let answered: HashSet<&str> = records
        .iter()
        .filter(|r| r.child_id.as_deref() == Some(child_id))
        .filter_map(|r| r.vaccination_session_id.as_deref())
        .collect();

    sessions
        .iter()
        .filter(|s| s.selected_participants.iter().any(|p| p == child_id))
        .filter(|s| !s.is_complete())
        .filter(|s| !answered.contains(s.id.as_str()))
        .map(|s| {
            let vaccine_name = s
                .selected_vaccine
                .as_deref()
                .and_then(|id| schedule.iter().find(|v| v.id == id))
                .and_then(|v| v.vaccine_name.clone())
                .unwrap_or_else(|| UNKNOWN_VACCINE.to_string());
            Reminder {
                session_id: s.id.clone(),
                vaccine_id: s.selected_vaccine.clone(),
                vaccine_name,
                date: s.date,
                start_time: s.start_time.clone(),
                end_time: s.end_time.clone(),
                description: describe(s),
                location: s.selected_center.clone(),
                notification_enabled: false,
            }
        })
        .collect()
}

/// Id of the local notification tied to one reminder.
pub fn notification_id(session_id: &str, child_id: &str) -> String {
    format!("reminder-{session_id}-{child_id}")
}

/// Fetch sessions and records for the child and compute its reminders.
pub fn load_reminders(
    store: &dyn DataStore,
    notifier: &dyn Notifier,
    schedule: &[VaccineSchedule],
    child_id: &str,
) -> Result<Vec<Reminder>, CoreError> {
    let sessions = db::list_sessions_for_child(store, child_id)?;
    let records = db::list_child_records(store, child_id)?;
    let mut reminders = compute_reminders(&sessions, &records, schedule, child_id);
    for reminder in &mut reminders {
        reminder.notification_enabled =
            notifier.is_scheduled(&notification_id(&reminder.session_id, child_id));
    }
    tracing::debug!(child_id, count = reminders.len(), "Computed reminders");
    Ok(reminders)
}

/// An outstanding reminder by session id.
pub fn find_reminder(
    store: &dyn DataStore,
    notifier: &dyn Notifier,
    schedule: &[VaccineSchedule],
    child_id: &str,
    session_id: &str,
) -> Result<Reminder, CoreError> {
    load_reminders(store, notifier, schedule, child_id)?
        .into_iter()
        .find(|r| r.session_id == session_id)
        .ok_or_else(|| CoreError::NotFound(format!("Reminder for session {session_id}")))
}

// ─── Responses ────────────────────────────────────────────────────────────────

fn response_record(
    reminder: &Reminder,
    user_id: &str,
    child_id: &str,
    status: RecordStatus,
    reason: Option<String>,
) -> VaccinationRecord {
    VaccinationRecord {
        id: String::new(),
        user_id: Some(user_id.to_string()),
        child_id: Some(child_id.to_string()),
        vaccine_id: reminder.vaccine_id.clone(),
        vaccine_name: Some(reminder.vaccine_name.clone()),
        vaccination_session_id: Some(reminder.session_id.clone()),
        scheduled_date: reminder.date,
        administered_date: None,
        status: Some(status.as_str().to_string()),
        reschedule_reason: reason,
        location: reminder.location.clone(),
        side_effects: Vec::new(),
    }
}

pub fn build_confirmation(reminder: &Reminder, user_id: &str, child_id: &str) -> VaccinationRecord {
    response_record(reminder, user_id, child_id, RecordStatus::Scheduled, None)
}

pub fn build_reschedule(
    reminder: &Reminder,
    user_id: &str,
    child_id: &str,
    reason: &str,
) -> Result<VaccinationRecord, CoreError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(CoreError::Validation(RESCHEDULE_REASON_REQUIRED.into()));
    }
    Ok(response_record(
        reminder,
        user_id,
        child_id,
        RecordStatus::Rescheduled,
        Some(reason.to_string()),
    ))
}

fn append(store: &dyn DataStore, mut record: VaccinationRecord) -> Result<VaccinationRecord, CoreError> {
    record.id = db::insert_record(store, &record)?;
    tracing::info!(
        record_id = %record.id,
        session = ?record.vaccination_session_id,
        status = ?record.status,
        "Vaccination response recorded"
    );
    Ok(record)
}

/// Accept the session: appends a `Scheduled` record.
pub fn confirm_attendance(
    store: &dyn DataStore,
    reminder: &Reminder,
    user_id: &str,
    child_id: &str,
) -> Result<VaccinationRecord, CoreError> {
    append(store, build_confirmation(reminder, user_id, child_id))
}

/// Decline the session with a reason: appends a `Rescheduled` record.
pub fn request_reschedule(
    store: &dyn DataStore,
    reminder: &Reminder,
    user_id: &str,
    child_id: &str,
    reason: &str,
) -> Result<VaccinationRecord, CoreError> {
    let record = build_reschedule(reminder, user_id, child_id, reason)?;
    append(store, record)
}

// ─── Local notification toggle ────────────────────────────────────────────────

/// When the reminder's notification fires: the day before, at the
/// configured hour. A time already past is pulled forward to `now`.
pub fn notification_time(date: NaiveDate, now: NaiveDateTime) -> NaiveDateTime {
    let hour = NaiveTime::from_hms_opt(config::REMINDER_HOUR, 0, 0).unwrap_or(NaiveTime::MIN);
    let fire_at = (date - Duration::days(config::REMINDER_LEAD_DAYS)).and_time(hour);
    fire_at.max(now)
}

/// Flip the local notification for a reminder. Returns the new state.
///
/// Notifier failures are logged and reported as "unchanged".
pub fn toggle_reminder_notification(
    notifier: &dyn Notifier,
    reminder: &Reminder,
    user_id: &str,
    child_id: &str,
    now: NaiveDateTime,
) -> Result<bool, CoreError> {
    let id = notification_id(&reminder.session_id, child_id);

    if notifier.is_scheduled(&id) {
        if let Err(e) = notifier.cancel(&id) {
            tracing::warn!(id = %id, error = %e, "Failed to cancel reminder notification");
            return Ok(true);
        }
        return Ok(false);
    }

    let date = reminder
        .date
        .ok_or_else(|| CoreError::Validation("This session has no date.".into()))?;

    let notification = LocalNotification {
        id: id.clone(),
        user_id: user_id.to_string(),
        title: "Vaccination Reminder".into(),
        body: format!(
            "{} on {}. {}",
            reminder.vaccine_name,
            date.format("%Y-%m-%d"),
            reminder.description
        ),
        fire_at: notification_time(date, now),
    };

    match notifier.schedule(notification) {
        Ok(()) => Ok(true),
        Err(e) => {
            tracing::warn!(id = %id, error = %e, "Failed to schedule reminder notification");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{collections, to_fields, SqliteDocumentStore};
    use crate::notifications::LocalNotifier;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn session(id: &str, vaccine: &str, children: &[&str], status: Option<&str>) -> VaccinationSession {
        VaccinationSession {
            id: id.into(),
            selected_vaccine: Some(vaccine.into()),
            selected_participants: children.iter().map(|c| c.to_string()).collect(),
            date: Some(date(2026, 11, 12)),
            start_time: Some("8:30 AM".into()),
            end_time: Some("12:00 PM".into()),
            selected_center: Some("Matara MOH".into()),
            selected_area: Some("Weligama".into()),
            status: status.map(String::from),
        }
    }

    fn schedule() -> Vec<VaccineSchedule> {
        vec![VaccineSchedule {
            id: "bcg".into(),
            vaccine_name: Some("BCG".into()),
            ..Default::default()
        }]
    }

    fn record(session_id: &str, child: &str, status: &str) -> VaccinationRecord {
        VaccinationRecord {
            child_id: Some(child.into()),
            vaccination_session_id: Some(session_id.into()),
            status: Some(status.into()),
            ..Default::default()
        }
    }

    #[test]
    fn outstanding_sessions_become_reminders() {
        let sessions = vec![
            session("s1", "bcg", &["c1"], None),
            session("s2", "bcg", &["c1"], Some("complete")),
            session("s3", "opv", &["c1", "c2"], Some("open")),
            session("s4", "bcg", &["c2"], None),
        ];
        let reminders = compute_reminders(&sessions, &[], &schedule(), "c1");
        let ids: Vec<&str> = reminders.iter().map(|r| r.session_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s3"]);

        assert_eq!(reminders[0].vaccine_name, "BCG");
        assert_eq!(reminders[1].vaccine_name, UNKNOWN_VACCINE);
        assert_eq!(
            reminders[0].description,
            "Vaccination at Matara MOH,Weligama starting from 8:30 AM to 12:00 PM"
        );
        assert_eq!(reminders[0].location.as_deref(), Some("Matara MOH"));
    }

    #[test]
    fn any_record_for_the_pair_hides_the_reminder() {
        let sessions = vec![session("s1", "bcg", &["c1", "c2"], None)];
        let records = vec![record("s1", "c1", "Rescheduled")];
        assert!(compute_reminders(&sessions, &records, &schedule(), "c1").is_empty());
        // sibling's record does not answer for this child
        assert_eq!(compute_reminders(&sessions, &records, &schedule(), "c2").len(), 1);
    }

    #[test]
    fn reschedule_requires_reason() {
        let r = &compute_reminders(&[session("s1", "bcg", &["c1"], None)], &[], &schedule(), "c1")[0];
        match build_reschedule(r, "u1", "c1", "   ") {
            Err(CoreError::Validation(msg)) => assert_eq!(msg, RESCHEDULE_REASON_REQUIRED),
            other => panic!("unexpected {other:?}"),
        }
        let rec = build_reschedule(r, "u1", "c1", "  travelling  ").unwrap();
        assert_eq!(rec.reschedule_reason.as_deref(), Some("travelling"));
        assert_eq!(rec.status.as_deref(), Some("Rescheduled"));
    }

    #[test]
    fn confirmation_record_shape() {
        let r = &compute_reminders(&[session("s1", "bcg", &["c1"], None)], &[], &schedule(), "c1")[0];
        let rec = build_confirmation(r, "u1", "c1");
        let fields = to_fields(&rec).unwrap();
        assert_eq!(fields["UserId"], "u1");
        assert_eq!(fields["childId"], "c1");
        assert_eq!(fields["status"], "Scheduled");
        assert_eq!(fields["vaccinationSessionId"], "s1");
        assert_eq!(fields["vaccineName"], "BCG");
        assert_eq!(fields["scheduledDate"], "2026-11-12");
        assert!(fields["administeredDate"].is_null());
        assert!(fields["rescheduleReason"].is_null());
        assert_eq!(fields["sideEffects"], serde_json::json!([]));
    }

    fn seeded() -> (Arc<SqliteDocumentStore>, LocalNotifier) {
        let store = Arc::new(SqliteDocumentStore::open_in_memory().unwrap());
        let path = format!("{}/bcg/{}", collections::SCHEDULES, collections::SESSIONS);
        store
            .set_document(&path, "s1", to_fields(&session("", "bcg", &["c1"], None)).unwrap())
            .unwrap();
        let notifier = LocalNotifier::new(store.clone());
        (store, notifier)
    }

    #[test]
    fn confirming_appends_and_clears_reminder() {
        let (store, notifier) = seeded();
        let reminder = find_reminder(store.as_ref(), &notifier, &schedule(), "c1", "s1").unwrap();
        confirm_attendance(store.as_ref(), &reminder, "u1", "c1").unwrap();

        assert!(load_reminders(store.as_ref(), &notifier, &schedule(), "c1")
            .unwrap()
            .is_empty());
        assert!(matches!(
            find_reminder(store.as_ref(), &notifier, &schedule(), "c1", "s1"),
            Err(CoreError::NotFound(_))
        ));
        assert_eq!(db::list_child_records(store.as_ref(), "c1").unwrap().len(), 1);
    }

    #[test]
    fn answer_with_locale_date_still_clears_reminder() {
        let (store, notifier) = seeded();
        store
            .add_document(
                collections::RECORDS,
                serde_json::json!({
                    "childId": "c1",
                    "vaccinationSessionId": "s1",
                    "status": "Rescheduled",
                    "scheduledDate": "11/12/2026",
                }),
            )
            .unwrap();

        assert!(load_reminders(store.as_ref(), &notifier, &schedule(), "c1")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn blank_reschedule_writes_nothing() {
        let (store, notifier) = seeded();
        let reminder = find_reminder(store.as_ref(), &notifier, &schedule(), "c1", "s1").unwrap();
        assert!(request_reschedule(store.as_ref(), &reminder, "u1", "c1", "").is_err());
        assert!(db::list_child_records(store.as_ref(), "c1").unwrap().is_empty());
    }

    #[test]
    fn toggle_schedules_then_cancels() {
        let (store, notifier) = seeded();
        let reminder = find_reminder(store.as_ref(), &notifier, &schedule(), "c1", "s1").unwrap();
        let now = date(2026, 11, 1).and_hms_opt(8, 0, 0).unwrap();

        assert!(toggle_reminder_notification(&notifier, &reminder, "u1", "c1", now).unwrap());
        let listed = load_reminders(store.as_ref(), &notifier, &schedule(), "c1").unwrap();
        assert!(listed[0].notification_enabled);

        let due = notifier.deliver_due(date(2026, 11, 11).and_hms_opt(9, 0, 0).unwrap());
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].fire_at, date(2026, 11, 11).and_hms_opt(9, 0, 0).unwrap());

        assert!(toggle_reminder_notification(&notifier, &reminder, "u1", "c1", now).unwrap());
        assert!(!toggle_reminder_notification(&notifier, &reminder, "u1", "c1", now).unwrap());
        assert!(!notifier.is_scheduled(&notification_id("s1", "c1")));
    }

    #[test]
    fn late_toggle_fires_immediately() {
        let now = date(2026, 11, 11).and_hms_opt(15, 0, 0).unwrap();
        assert_eq!(notification_time(date(2026, 11, 12), now), now);
        let early = date(2026, 11, 1).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(
            notification_time(date(2026, 11, 12), early),
            date(2026, 11, 11).and_hms_opt(9, 0, 0).unwrap()
        );
    }
}
