use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dates::lenient_date;

/// Master schedule entry from `VaccinationSchedules/{vaccineId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineSchedule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub vaccine_name: Option<String>,
    #[serde(default)]
    pub age_due: Option<String>,
    #[serde(default)]
    pub vaccine_details: Option<String>,
    #[serde(default)]
    pub national_health_guidelines: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Per child, per vaccine, per session outcome. Never deleted.
///
/// `status` stays a raw string: records written by other tools may carry
/// values outside `RecordStatus`, and the status merge must still see them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccinationRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "UserId", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub child_id: Option<String>,
    #[serde(default)]
    pub vaccine_id: Option<String>,
    #[serde(default)]
    pub vaccine_name: Option<String>,
    #[serde(default)]
    pub vaccination_session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub administered_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reschedule_reason: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub side_effects: Vec<String>,
}

/// A group vaccination event inviting a set of children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccinationSession {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub selected_vaccine: Option<String>,
    #[serde(default)]
    pub selected_participants: Vec<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub selected_center: Option<String>,
    #[serde(default)]
    pub selected_area: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl VaccinationSession {
    pub fn is_complete(&self) -> bool {
        self.status.as_deref() == Some("complete")
    }
}
