//! Vaccination progress: schedule × records → derived status per vaccine,
//! plus the record views used by the home and analysis screens.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::models::enums::{RecordStatus, StatusTab};
use crate::models::{VaccinationRecord, VaccineSchedule};

// ═══════════════════════════════════════════════════════════
// Derived status
// ═══════════════════════════════════════════════════════════

/// Status of one vaccine for one child.
///
/// `Other` carries a record status outside the known set, surfaced as-is
/// when it is the first record's status in the fallback tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivedStatus {
    Completed,
    Scheduled,
    Rescheduled,
    Pending,
    Other(String),
}

impl DerivedStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "Completed",
            Self::Scheduled => "Scheduled",
            Self::Rescheduled => "Rescheduled",
            Self::Pending => "Pending",
            Self::Other(s) => s,
        }
    }

    /// Status of a single stored record. A record without one counts as pending.
    pub fn from_record(record: &VaccinationRecord) -> Self {
        match record.status.as_deref() {
            None | Some("") => Self::Pending,
            Some(s) => match s.parse::<RecordStatus>() {
                Ok(RecordStatus::Completed) => Self::Completed,
                Ok(RecordStatus::Scheduled) => Self::Scheduled,
                Ok(RecordStatus::Rescheduled) => Self::Rescheduled,
                Err(_) => Self::Other(s.to_string()),
            },
        }
    }
}

impl Serialize for DerivedStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One row of the vaccine step list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineProgress {
    pub vaccine_id: String,
    pub name: Option<String>,
    pub age_due: Option<String>,
    pub image_url: Option<String>,
    pub status: DerivedStatus,
}

fn has_status(records: &[&VaccinationRecord], status: RecordStatus) -> bool {
    records
        .iter()
        .any(|r| r.status.as_deref() == Some(status.as_str()))
}

/// Derive each scheduled vaccine's status for `child_id`.
///
/// Precedence: any Completed record, else any Scheduled record, else the
/// first matching record's status in fetch order, else Pending. Output
/// follows the schedule's order.
pub fn merge_status(
    schedule: &[VaccineSchedule],
    records: &[VaccinationRecord],
    child_id: &str,
) -> Vec<VaccineProgress> {
    let mut by_vaccine: HashMap<&str, Vec<&VaccinationRecord>> = HashMap::new();
    for record in records
        .iter()
        .filter(|r| r.child_id.as_deref() == Some(child_id))
    {
        if let Some(vaccine_id) = record.vaccine_id.as_deref() {
            by_vaccine.entry(vaccine_id).or_default().push(record);
        }
    }

    schedule
        .iter()
        .map(|vaccine| {
            let matching = by_vaccine
                .get(vaccine.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let status = if has_status(matching, RecordStatus::Completed) {
                DerivedStatus::Completed
            } else if has_status(matching, RecordStatus::Scheduled) {
                DerivedStatus::Scheduled
            } else if let Some(first) = matching.first() {
                DerivedStatus::from_record(first)
            } else {
                DerivedStatus::Pending
            };

            VaccineProgress {
                vaccine_id: vaccine.id.clone(),
                name: vaccine.vaccine_name.clone(),
                age_due: vaccine.age_due.clone(),
                image_url: vaccine.image_url.clone(),
                status,
            }
        })
        .collect()
}

/// Rows shown under a status tab.
pub fn filter_by_tab(progress: Vec<VaccineProgress>, tab: StatusTab) -> Vec<VaccineProgress> {
    match tab {
        StatusTab::All => progress,
        StatusTab::Completed => progress
            .into_iter()
            .filter(|p| p.status == DerivedStatus::Completed)
            .collect(),
        StatusTab::Scheduled => progress
            .into_iter()
            .filter(|p| p.status == DerivedStatus::Scheduled)
            .collect(),
    }
}

// ═══════════════════════════════════════════════════════════
// Record views
// ═══════════════════════════════════════════════════════════

/// Per-status record counts for the analysis tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub completed: usize,
    pub scheduled: usize,
    pub rescheduled: usize,
    pub other: usize,
}

pub fn status_counts(records: &[VaccinationRecord]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for record in records {
        match DerivedStatus::from_record(record) {
            DerivedStatus::Completed => counts.completed += 1,
            DerivedStatus::Scheduled => counts.scheduled += 1,
            DerivedStatus::Rescheduled => counts.rescheduled += 1,
            DerivedStatus::Pending | DerivedStatus::Other(_) => counts.other += 1,
        }
    }
    counts
}

/// A record enriched with its vaccine's image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    #[serde(flatten)]
    pub record: VaccinationRecord,
    pub image_url: Option<String>,
}

pub fn attach_images(records: Vec<VaccinationRecord>, schedule: &[VaccineSchedule]) -> Vec<RecordView> {
    records
        .into_iter()
        .map(|record| {
            let image_url = record.vaccine_id.as_deref().and_then(|id| {
                schedule
                    .iter()
                    .find(|v| v.id == id)
                    .and_then(|v| v.image_url.clone())
            });
            RecordView { record, image_url }
        })
        .collect()
}

/// Case-insensitive vaccine-name search. An empty query keeps everything.
pub fn search_records(records: Vec<RecordView>, query: &str) -> Vec<RecordView> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|view| {
            view.record
                .vaccine_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .collect()
}
