//! Vaccine schedule and record endpoints for the selected child.
//!
//! - `GET /api/vaccines?tab=`: progress list (schedule merged with records)
//! - `GET /api/vaccines/:id`: schedule entry and the child's status for it
//! - `GET /api/records?status=&search=`: record list with vaccine images
//! - `GET /api/records/summary`: per-status counts
//! - `GET /api/records/:id`: one record

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthSession};
use crate::db;
use crate::models::enums::{RecordStatus, StatusTab};
use crate::models::{VaccinationRecord, VaccineSchedule};
use crate::vaccination::{self, DerivedStatus, RecordView, StatusCounts, VaccineProgress};

#[derive(Deserialize)]
pub struct TabQuery {
    #[serde(default)]
    pub tab: StatusTab,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub child_id: String,
    pub vaccines: Vec<VaccineProgress>,
}

pub async fn progress(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<TabQuery>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let child_id = session.user.require_child()?;
    let schedule = ctx.core.vaccine_schedule()?;
    let records = db::list_child_records(ctx.core.store(), child_id)?;
    let merged = vaccination::merge_status(&schedule, &records, child_id);

    Ok(Json(ProgressResponse {
        child_id: child_id.to_string(),
        vaccines: vaccination::filter_by_tab(merged, query.tab),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineDetailResponse {
    pub vaccine: VaccineSchedule,
    /// Absent when no child is selected.
    pub status: Option<DerivedStatus>,
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(vaccine_id): Path<String>,
) -> Result<Json<VaccineDetailResponse>, ApiError> {
    let schedule = ctx.core.vaccine_schedule()?;
    let vaccine = schedule
        .iter()
        .find(|v| v.id == vaccine_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Vaccine {vaccine_id}")))?;

    let status = match session.user.selected_child_id.as_deref() {
        Some(child_id) => {
            let records = db::list_child_records(ctx.core.store(), child_id)?;
            vaccination::merge_status(std::slice::from_ref(&vaccine), &records, child_id)
                .pop()
                .map(|p| p.status)
        }
        None => None,
    };

    Ok(Json(VaccineDetailResponse { vaccine, status }))
}

#[derive(Deserialize)]
pub struct RecordQuery {
    pub status: Option<RecordStatus>,
    pub search: Option<String>,
}

#[derive(Serialize)]
pub struct RecordsResponse {
    pub records: Vec<RecordView>,
}

pub async fn records(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let child_id = session.user.require_child()?;
    let store = ctx.core.store();
    let records = match query.status {
        Some(status) => db::list_child_records_by_status(store, child_id, status.as_str())?,
        None => db::list_child_records(store, child_id)?,
    };
    let schedule = ctx.core.vaccine_schedule()?;
    let views = vaccination::attach_images(records, &schedule);

    Ok(Json(RecordsResponse {
        records: vaccination::search_records(views, query.search.as_deref().unwrap_or("")),
    }))
}

pub async fn summary(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<StatusCounts>, ApiError> {
    let child_id = session.user.require_child()?;
    let records = db::list_child_records(ctx.core.store(), child_id)?;
    Ok(Json(vaccination::status_counts(&records)))
}

/// Visible only when the record's child belongs to the caller.
pub async fn record(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(record_id): Path<String>,
) -> Result<Json<VaccinationRecord>, ApiError> {
    let store = ctx.core.store();
    let not_found = || ApiError::NotFound(format!("Record {record_id}"));

    let record = db::get_record(store, &record_id)?.ok_or_else(not_found)?;
    let child_id = record.child_id.as_deref().ok_or_else(not_found)?;
    if db::get_child(store, session.user_id(), child_id)?.is_none() {
        return Err(not_found());
    }
    Ok(Json(record))
}
