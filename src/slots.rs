//! Appointment slot computation.
//!
//! A midwife session (`startTime`..`endTime` split into `noOfSlots` equal
//! slots) is turned into the list of free slot labels for a day. Labels are
//! 12-hour clock strings (`"9:00 AM"`); booked slots are stored with the
//! same format and compared by string equality.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::Session;

// ═══════════════════════════════════════════════════════════
// Clock strings
// ═══════════════════════════════════════════════════════════

/// Parse a wall-clock string at minute resolution.
///
/// Accepts `H:MM AM`/`HH:MM PM` (meridiem case-insensitive, space optional)
/// and 24-hour `HH:MM`. `12:xx AM` is midnight, `12:xx PM` is noon.
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let upper = raw.trim().to_ascii_uppercase();
    let (clock, pm) = if let Some(rest) = upper.strip_suffix("AM") {
        (rest.trim_end(), Some(false))
    } else if let Some(rest) = upper.strip_suffix("PM") {
        (rest.trim_end(), Some(true))
    } else {
        (upper.as_str(), None)
    };

    let (h, m) = clock.split_once(':')?;
    if m.len() != 2 {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;

    let hour = match pm {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            }
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Canonical slot label: hour unpadded, minutes zero-padded, AM/PM suffix.
pub fn format_slot_label(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Start instant of a booked slot, for lead-time checks.
pub fn slot_start(date: NaiveDate, label: &str) -> Option<NaiveDateTime> {
    parse_clock_time(label).map(|t| date.and_time(t))
}

// ═══════════════════════════════════════════════════════════
// Slot generation
// ═══════════════════════════════════════════════════════════

/// Every slot label of a session, booked or not, in time order.
///
/// Empty when either time is missing or unparsable, when the end is not
/// after the start, or when the session has no slots.
pub fn all_slots(session: &Session) -> Vec<String> {
    let start = session.start_time.as_deref().and_then(parse_clock_time);
    let end = session.end_time.as_deref().and_then(parse_clock_time);
    let n = i64::from(session.no_of_slots.unwrap_or(0));

    let (Some(start), Some(end)) = (start, end) else {
        return Vec::new();
    };
    if end <= start || n == 0 {
        return Vec::new();
    }

    let span = (end - start).num_seconds();
    let mut labels: Vec<String> = (0..n)
        .map(|i| format_slot_label(start + Duration::seconds(span * i / n)))
        .collect();
    // sub-minute slots collapse onto the same label
    labels.dedup();
    labels
}

/// Free slot labels of a session: all slots minus `bookedSlots`.
pub fn compute_available_slots(session: &Session) -> Vec<String> {
    all_slots(session)
        .into_iter()
        .filter(|label| !session.booked_slots.contains(label))
        .collect()
}

/// Optional narrowing of which sessions a booking may use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFilter {
    pub session_type: Option<String>,
    pub location: Option<String>,
}

impl SessionFilter {
    pub fn accepts(&self, session: &Session) -> bool {
        let type_ok = self
            .session_type
            .as_ref()
            .map_or(true, |t| session.session_type.as_ref() == Some(t));
        let location_ok = self
            .location
            .as_ref()
            .map_or(true, |l| session.location.as_ref() == Some(l));
        type_ok && location_ok
    }
}

/// Sessions held on `date` that pass the filter.
pub fn sessions_on<'a>(
    sessions: &'a [Session],
    date: NaiveDate,
    filter: &'a SessionFilter,
) -> impl Iterator<Item = &'a Session> + 'a {
    sessions
        .iter()
        .filter(move |s| s.date == Some(date) && filter.accepts(s))
}

/// Free slots of every session on `date`, pooled and sorted by time of day.
pub fn pool_available_slots(
    sessions: &[Session],
    date: NaiveDate,
    filter: &SessionFilter,
) -> Vec<String> {
    let mut pooled: Vec<(NaiveTime, String)> = sessions_on(sessions, date, filter)
        .flat_map(compute_available_slots)
        .filter_map(|label| parse_clock_time(&label).map(|t| (t, label)))
        .collect();
    pooled.sort();
    pooled.dedup();
    pooled.into_iter().map(|(_, label)| label).collect()
}

// ═══════════════════════════════════════════════════════════
// Day picker
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayOption {
    pub date: NaiveDate,
    /// Short weekday name (`Mon`).
    pub day: String,
    /// True when at least one session is held that day.
    pub selectable: bool,
}

/// `n` consecutive days starting at `today`.
pub fn next_n_days(today: NaiveDate, n: u32, sessions: &[Session]) -> Vec<DayOption> {
    today
        .iter_days()
        .take(n as usize)
        .map(|date| DayOption {
            date,
            day: date.format("%a").to_string(),
            selectable: sessions.iter().any(|s| s.date == Some(date)),
        })
        .collect()
}
