//! Community events: status by date, filtering, detail and joining.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::core_state::CoreError;
use crate::db::{self, DataStore};
use crate::models::enums::EventStatus;
use crate::models::{Event, UserProfile};

/// Status of an event held on `date`, compared by calendar day.
pub fn event_status(date: NaiveDate, today: NaiveDate) -> EventStatus {
    if date < today {
        EventStatus::Completed
    } else if date == today {
        EventStatus::Ongoing
    } else {
        EventStatus::Upcoming
    }
}

/// Filters for the event list. Every set field must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventQuery {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub status: Option<EventStatus>,
}

impl EventQuery {
    fn matches(&self, event: &Event, status: Option<EventStatus>) -> bool {
        if let Some(title) = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = title.to_lowercase();
            let hit = event
                .event_title
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        let date = event.event_date;
        if self.date.is_some() && date != self.date {
            return false;
        }
        if let Some(month) = self.month {
            if date.map(|d| d.month()) != Some(month) {
                return false;
            }
        }
        if let Some(year) = self.year {
            if date.map(|d| d.year()) != Some(year) {
                return false;
            }
        }
        if self.status.is_some() && status != self.status {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: Event,
    /// Absent when the event has no date.
    pub status: Option<EventStatus>,
    pub attendee_count: usize,
}

/// Events matching `query`, ordered by date (undated last).
pub fn list_events(
    store: &dyn DataStore,
    query: &EventQuery,
    today: NaiveDate,
) -> Result<Vec<EventSummary>, CoreError> {
    let mut events: Vec<EventSummary> = db::list_events(store)?
        .into_iter()
        .filter_map(|event| {
            let status = event.event_date.map(|d| event_status(d, today));
            query.matches(&event, status).then(|| EventSummary {
                status,
                attendee_count: event.event_joined_people.len(),
                event,
            })
        })
        .collect();

    events.sort_by_key(|e| (e.event.event_date.is_none(), e.event.event_date));
    Ok(events)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Organizer {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub id: String,
    pub name: Option<String>,
}

impl From<UserProfile> for Attendee {
    fn from(user: UserProfile) -> Self {
        Self {
            id: user.id,
            name: user.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub status: Option<EventStatus>,
    pub organizer: Option<Organizer>,
    pub attendees: Vec<Attendee>,
    pub joined: bool,
}

fn load_event(store: &dyn DataStore, event_id: &str) -> Result<Event, CoreError> {
    db::get_event(store, event_id)?.ok_or_else(|| CoreError::NotFound(format!("Event {event_id}")))
}

/// One event with its organizer midwife and attendee profiles resolved.
pub fn event_detail(
    store: &dyn DataStore,
    event_id: &str,
    user_id: &str,
    today: NaiveDate,
) -> Result<EventDetail, CoreError> {
    let event = load_event(store, event_id)?;

    let organizer = match event.event_organizer.as_deref() {
        Some(id) => db::get_midwife(store, id)?.map(|m| Organizer {
            id: m.id,
            name: m.name,
            image: m.image,
            phone: m.phone,
        }),
        None => None,
    };
    let attendees = db::get_users(store, &event.event_joined_people)?
        .into_iter()
        .map(Attendee::from)
        .collect();

    Ok(EventDetail {
        status: event.event_date.map(|d| event_status(d, today)),
        joined: event.event_joined_people.iter().any(|p| p == user_id),
        organizer,
        attendees,
        event,
    })
}

/// Add the user to the event's attendees. Joining twice is a no-op;
/// finished events cannot be joined.
pub fn join_event(
    store: &dyn DataStore,
    event_id: &str,
    user_id: &str,
    today: NaiveDate,
) -> Result<Event, CoreError> {
    let mut event = load_event(store, event_id)?;

    if event.event_date.map(|d| event_status(d, today)) == Some(EventStatus::Completed) {
        return Err(CoreError::Validation("This event has already ended.".into()));
    }
    if event.event_joined_people.iter().any(|p| p == user_id) {
        return Ok(event);
    }

    event.event_joined_people.push(user_id.to_string());
    db::update_joined_people(store, event_id, &event.event_joined_people)?;
    tracing::info!(event_id, user_id, "Joined event");
    Ok(event)
}
