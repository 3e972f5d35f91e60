//! Repository layer: typed accessors over the document store.
//!
//! Each sub-module owns one collection family. Documents are decoded into
//! the typed records in `models`; a document that cannot be decoded is
//! skipped with a warning rather than failing the whole listing.

mod appointment;
mod child;
mod event;
mod midwife;
mod user;
mod vaccination;

pub use appointment::*;
pub use child::*;
pub use event::*;
pub use midwife::*;
pub use user::*;
pub use vaccination::*;

use serde::de::DeserializeOwned;

use super::{DatabaseError, Document};
use crate::models::*;

/// Collection names as they appear in the document tree.
pub mod collections {
    pub const MIDWIVES: &str = "Midwives";
    pub const APPOINTMENTS: &str = "MidwifeAppointments";
    pub const USERS: &str = "Users";
    pub const CHILDREN: &str = "Childrens";
    pub const SCHEDULES: &str = "VaccinationSchedules";
    pub const RECORDS: &str = "VaccinationRecords";
    pub const SESSIONS: &str = "VaccinationSessions";
    pub const EVENTS: &str = "Events";

    /// `Users/{uid}/Childrens`
    pub fn children_of(user_id: &str) -> String {
        format!("{USERS}/{user_id}/{CHILDREN}")
    }
}

/// Records whose document id is carried on the struct.
pub trait Identified {
    fn set_id(&mut self, id: String);
}

macro_rules! identified {
    ($($ty:ty),+ $(,)?) => {
        $(impl Identified for $ty {
            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        })+
    };
}

identified!(
    Midwife,
    Appointment,
    Child,
    VaccineSchedule,
    VaccinationRecord,
    VaccinationSession,
    Event,
    UserProfile,
);

/// Decode one document, filling in its id.
pub fn decode_doc<T: DeserializeOwned + Identified>(doc: &Document) -> Result<T, DatabaseError> {
    let mut value: T = doc.decode()?;
    value.set_id(doc.id.clone());
    Ok(value)
}

/// Decode a listing, skipping malformed documents.
pub fn decode_all<T: DeserializeOwned + Identified>(docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match decode_doc(doc) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(path = %doc.path, error = %e, "Skipping malformed document");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_all_skips_malformed_documents() {
        let docs = vec![
            Document {
                id: "e1".into(),
                path: "Events/e1".into(),
                data: json!({"EventTitle": "Yoga", "EventDate": "2026-05-02"}),
            },
            Document {
                id: "e2".into(),
                path: "Events/e2".into(),
                data: json!({"EventTitle": "Broken", "EventJoinedPeople": "everyone"}),
            },
        ];
        let events: Vec<Event> = decode_all(&docs);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "e1");
    }

    #[test]
    fn unreadable_date_keeps_the_document() {
        let docs = vec![Document {
            id: "e3".into(),
            path: "Events/e3".into(),
            data: json!({"EventTitle": "Clinic day", "EventDate": "sometime soon"}),
        }];
        let events: Vec<Event> = decode_all(&docs);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_title.as_deref(), Some("Clinic day"));
        assert!(events[0].event_date.is_none());
    }

    #[test]
    fn children_path_nests_under_user() {
        assert_eq!(collections::children_of("u1"), "Users/u1/Childrens");
    }
}
