use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{Gender, MeasurementKind};

/// One growth measurement (cm or kg depending on the history).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementEntry {
    pub value: f64,
    pub date: NaiveDate,
}

/// Growth histories, each insertion-ordered and append-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurements {
    #[serde(default)]
    pub height_history: Vec<MeasurementEntry>,
    #[serde(default)]
    pub weight_history: Vec<MeasurementEntry>,
    #[serde(default)]
    pub head_circumference_history: Vec<MeasurementEntry>,
}

impl Measurements {
    pub fn history(&self, kind: MeasurementKind) -> &[MeasurementEntry] {
        match kind {
            MeasurementKind::Height => &self.height_history,
            MeasurementKind::Weight => &self.weight_history,
            MeasurementKind::HeadCircumference => &self.head_circumference_history,
        }
    }

    pub fn history_mut(&mut self, kind: MeasurementKind) -> &mut Vec<MeasurementEntry> {
        match kind {
            MeasurementKind::Height => &mut self.height_history,
            MeasurementKind::Weight => &mut self.weight_history,
            MeasurementKind::HeadCircumference => &mut self.head_circumference_history,
        }
    }
}

/// A child profile under `Users/{uid}/Childrens/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub measurements: Measurements,
}
