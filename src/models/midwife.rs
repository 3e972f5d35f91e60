use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dates::lenient_date;

/// A bookable block of a midwife's time, embedded in `Midwives/{id}.sessions`.
///
/// Times are kept as the wall-clock strings stored in the document
/// (`"9:00 AM"`); `slots::parse_clock_time` interprets them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub no_of_slots: Option<u32>,
    #[serde(default)]
    pub booked_slots: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub session_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Midwife {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub joined_date: Option<NaiveDate>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sessions: Vec<Session>,
}
