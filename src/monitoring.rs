//! Child profiles and growth monitoring.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::age::{calculate_age, Age};
use crate::core_state::CoreError;
use crate::db::{self, DataStore};
use crate::models::enums::{Gender, MeasurementKind};
use crate::models::{Child, MeasurementEntry, Measurements};

pub const FILL_ALL_FIELDS: &str = "Please fill in all fields.";

// ═══════════════════════════════════════════════════════════
// Profiles
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChild {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
}

impl NewChild {
    fn validate(&self, today: NaiveDate) -> Result<Child, CoreError> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        let gender = self.gender.as_deref().map(str::trim).unwrap_or_default();
        let (false, false, Some(birthday)) = (name.is_empty(), gender.is_empty(), self.birthday)
        else {
            return Err(CoreError::Validation(FILL_ALL_FIELDS.into()));
        };

        let gender: Gender = gender
            .parse()
            .map_err(|_| CoreError::Validation(format!("Unknown gender: {gender}")))?;
        if birthday > today {
            return Err(CoreError::Validation("Birthday cannot be in the future.".into()));
        }

        Ok(Child {
            id: String::new(),
            name: Some(name.to_string()),
            gender: Some(gender),
            birthday: Some(birthday),
            measurements: Measurements::default(),
        })
    }
}

pub fn add_child(
    store: &dyn DataStore,
    user_id: &str,
    new_child: &NewChild,
    today: NaiveDate,
) -> Result<Child, CoreError> {
    let mut child = new_child.validate(today)?;
    child.id = db::insert_child(store, user_id, &child)?;
    tracing::info!(user_id, child_id = %child.id, "Child added");
    Ok(child)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSummary {
    pub id: String,
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub birthday: Option<NaiveDate>,
    pub age: Option<Age>,
    /// `"1 years, 2 months, 3 days"`
    pub age_label: Option<String>,
}

impl ChildSummary {
    fn new(child: &Child, today: NaiveDate) -> Self {
        let age = child.birthday.map(|b| calculate_age(b, today));
        Self {
            id: child.id.clone(),
            name: child.name.clone(),
            gender: child.gender,
            birthday: child.birthday,
            age,
            age_label: age.map(|a| a.to_string()),
        }
    }
}

pub fn list_children(
    store: &dyn DataStore,
    user_id: &str,
    today: NaiveDate,
) -> Result<Vec<ChildSummary>, CoreError> {
    let children = db::list_children(store, user_id)?;
    Ok(children.iter().map(|c| ChildSummary::new(c, today)).collect())
}

fn load_child(store: &dyn DataStore, user_id: &str, child_id: &str) -> Result<Child, CoreError> {
    db::get_child(store, user_id, child_id)?
        .ok_or_else(|| CoreError::NotFound(format!("Child {child_id}")))
}

/// Most recent entry of each growth history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestGrowth {
    pub height: Option<MeasurementEntry>,
    pub weight: Option<MeasurementEntry>,
    pub head_circumference: Option<MeasurementEntry>,
}

fn latest(entries: &[MeasurementEntry]) -> Option<MeasurementEntry> {
    // last of equal dates wins
    entries.iter().max_by_key(|e| e.date).cloned()
}

impl LatestGrowth {
    pub fn from_measurements(m: &Measurements) -> Self {
        Self {
            height: latest(&m.height_history),
            weight: latest(&m.weight_history),
            head_circumference: latest(&m.head_circumference_history),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildDetail {
    #[serde(flatten)]
    pub summary: ChildSummary,
    pub latest: LatestGrowth,
}

pub fn child_detail(
    store: &dyn DataStore,
    user_id: &str,
    child_id: &str,
    today: NaiveDate,
) -> Result<ChildDetail, CoreError> {
    let child = load_child(store, user_id, child_id)?;
    Ok(ChildDetail {
        summary: ChildSummary::new(&child, today),
        latest: LatestGrowth::from_measurements(&child.measurements),
    })
}

/// Remove a child and everything stored under it.
pub fn delete_child(store: &dyn DataStore, user_id: &str, child_id: &str) -> Result<(), CoreError> {
    load_child(store, user_id, child_id)?;
    db::delete_child(store, user_id, child_id)?;
    tracing::info!(user_id, child_id, "Child deleted");
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Measurements
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct NewMeasurement {
    pub kind: MeasurementKind,
    pub value: f64,
    pub date: NaiveDate,
}

/// Append one measurement to the matching history.
pub fn record_measurement(
    store: &dyn DataStore,
    user_id: &str,
    child_id: &str,
    entry: &NewMeasurement,
    today: NaiveDate,
) -> Result<Vec<MeasurementEntry>, CoreError> {
    if !entry.value.is_finite() || entry.value <= 0.0 {
        return Err(CoreError::Validation(
            "Measurement must be a positive number.".into(),
        ));
    }
    if entry.date > today {
        return Err(CoreError::Validation(
            "Measurement date cannot be in the future.".into(),
        ));
    }

    let mut child = load_child(store, user_id, child_id)?;
    child.measurements.history_mut(entry.kind).push(MeasurementEntry {
        value: entry.value,
        date: entry.date,
    });
    db::update_measurements(store, user_id, child_id, &child.measurements)?;

    tracing::info!(child_id, kind = %entry.kind, "Measurement recorded");
    Ok(sorted_newest_first(child.measurements.history(entry.kind)))
}

fn sorted_newest_first(entries: &[MeasurementEntry]) -> Vec<MeasurementEntry> {
    let mut out: Vec<MeasurementEntry> = entries.iter().rev().cloned().collect();
    out.sort_by(|a, b| b.date.cmp(&a.date));
    out
}

pub fn measurement_history(
    store: &dyn DataStore,
    user_id: &str,
    child_id: &str,
    kind: MeasurementKind,
) -> Result<Vec<MeasurementEntry>, CoreError> {
    let child = load_child(store, user_id, child_id)?;
    Ok(sorted_newest_first(child.measurements.history(kind)))
}
