use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dates::lenient_date;

/// Community health event from `Events/{id}`. Field names are PascalCase
/// in the stored documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Event {
    #[serde(rename = "id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub event_title: Option<String>,
    #[serde(default)]
    pub event_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub event_date: Option<NaiveDate>,
    #[serde(default)]
    pub event_start_time: Option<String>,
    #[serde(default)]
    pub event_end_time: Option<String>,
    #[serde(default)]
    pub event_description: Option<String>,
    /// Midwife id of the organizer.
    #[serde(default)]
    pub event_organizer: Option<String>,
    #[serde(default)]
    pub event_location: Option<String>,
    #[serde(default)]
    pub event_joined_people: Vec<String>,
}
