//! Vaccination reminder endpoints for the selected child.
//!
//! - `GET  /api/reminders` / `GET /api/reminders/count`
//! - `POST /api/reminders/:session_id/confirm`
//! - `POST /api/reminders/:session_id/reschedule`
//! - `POST /api/reminders/:session_id/notification`: toggle local notification

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{now, ApiContext, AuthSession};
use crate::models::VaccinationRecord;
use crate::reminders::{self, Reminder, RescheduleRequest};

#[derive(Serialize)]
pub struct RemindersResponse {
    pub count: usize,
    pub reminders: Vec<Reminder>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<RemindersResponse>, ApiError> {
    let child_id = session.user.require_child()?;
    let schedule = ctx.core.vaccine_schedule()?;
    let reminders =
        reminders::load_reminders(ctx.core.store(), ctx.core.notifier(), &schedule, child_id)?;
    Ok(Json(RemindersResponse {
        count: reminders.len(),
        reminders,
    }))
}

#[derive(Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// Badge count; zero when no child is selected.
pub async fn count(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<CountResponse>, ApiError> {
    let Some(child_id) = session.user.selected_child_id.as_deref() else {
        return Ok(Json(CountResponse { count: 0 }));
    };
    let schedule = ctx.core.vaccine_schedule()?;
    let count =
        reminders::load_reminders(ctx.core.store(), ctx.core.notifier(), &schedule, child_id)?
            .len();
    Ok(Json(CountResponse { count }))
}

fn outstanding(
    ctx: &ApiContext,
    session: &AuthSession,
    session_id: &str,
) -> Result<(String, Reminder), ApiError> {
    let child_id = session.user.require_child()?;
    let schedule = ctx.core.vaccine_schedule()?;
    let reminder = reminders::find_reminder(
        ctx.core.store(),
        ctx.core.notifier(),
        &schedule,
        child_id,
        session_id,
    )?;
    Ok((child_id.to_string(), reminder))
}

pub async fn confirm(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(session_id): Path<String>,
) -> Result<(StatusCode, Json<VaccinationRecord>), ApiError> {
    let (child_id, reminder) = outstanding(&ctx, &session, &session_id)?;
    let record =
        reminders::confirm_attendance(ctx.core.store(), &reminder, session.user_id(), &child_id)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn reschedule(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(session_id): Path<String>,
    Json(request): Json<RescheduleRequest>,
) -> Result<(StatusCode, Json<VaccinationRecord>), ApiError> {
    let (child_id, reminder) = outstanding(&ctx, &session, &session_id)?;
    let record = reminders::request_reschedule(
        ctx.core.store(),
        &reminder,
        session.user_id(),
        &child_id,
        &request.reason,
    )?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub notification_enabled: bool,
}

pub async fn toggle_notification(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(session_id): Path<String>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let (child_id, reminder) = outstanding(&ctx, &session, &session_id)?;
    let notification_enabled = reminders::toggle_reminder_notification(
        ctx.core.notifier(),
        &reminder,
        session.user_id(),
        &child_id,
        now(),
    )?;
    Ok(Json(ToggleResponse {
        notification_enabled,
    }))
}
