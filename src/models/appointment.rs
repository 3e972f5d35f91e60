use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

/// A booked midwife slot, stored in `MidwifeAppointments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub midwife_id: Option<String>,
    #[serde(default)]
    pub midwife_name: Option<String>,
    pub date: NaiveDate,
    pub time_slot: String,
    #[serde(default)]
    pub session_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub status: AppointmentStatus,
    /// Booking user's id.
    pub user: String,
    /// Child the visit is for, when one was selected.
    #[serde(default)]
    pub child: Option<String>,
}
