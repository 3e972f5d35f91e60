//! Child profile and growth endpoints.
//!
//! - `GET    /api/children` / `POST /api/children`
//! - `GET    /api/children/:id` / `DELETE /api/children/:id`
//! - `POST   /api/children/:id/measurements`
//! - `GET    /api/children/:id/measurements/:kind`

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{today, ApiContext, AuthSession};
use crate::models::enums::MeasurementKind;
use crate::models::{Child, MeasurementEntry};
use crate::monitoring::{self, ChildDetail, ChildSummary, NewChild, NewMeasurement};

#[derive(Serialize)]
pub struct ChildrenResponse {
    pub children: Vec<ChildSummary>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<ChildrenResponse>, ApiError> {
    let children = monitoring::list_children(ctx.core.store(), session.user_id(), today())?;
    Ok(Json(ChildrenResponse { children }))
}

pub async fn add(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Json(request): Json<NewChild>,
) -> Result<(StatusCode, Json<Child>), ApiError> {
    let child = monitoring::add_child(ctx.core.store(), session.user_id(), &request, today())?;
    Ok((StatusCode::CREATED, Json(child)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(child_id): Path<String>,
) -> Result<Json<ChildDetail>, ApiError> {
    Ok(Json(monitoring::child_detail(
        ctx.core.store(),
        session.user_id(),
        &child_id,
        today(),
    )?))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(child_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    monitoring::delete_child(ctx.core.store(), session.user_id(), &child_id)?;
    ctx.core.forget_child(&child_id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub kind: MeasurementKind,
    pub entries: Vec<MeasurementEntry>,
}

pub async fn add_measurement(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(child_id): Path<String>,
    Json(request): Json<NewMeasurement>,
) -> Result<(StatusCode, Json<HistoryResponse>), ApiError> {
    let entries = monitoring::record_measurement(
        ctx.core.store(),
        session.user_id(),
        &child_id,
        &request,
        today(),
    )?;
    Ok((
        StatusCode::CREATED,
        Json(HistoryResponse {
            kind: request.kind,
            entries,
        }),
    ))
}

pub async fn history(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path((child_id, kind)): Path<(String, String)>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let kind: MeasurementKind = kind
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown measurement: {kind}")))?;
    let entries =
        monitoring::measurement_history(ctx.core.store(), session.user_id(), &child_id, kind)?;
    Ok(Json(HistoryResponse { kind, entries }))
}
