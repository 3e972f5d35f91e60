//! Appointment endpoints.
//!
//! - `GET  /api/appointments?tab=All|Scheduled|Completed`
//! - `GET  /api/appointments/:id`
//! - `POST /api/appointments/:id/cancel`

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{now, ApiContext, AuthSession};
use crate::appointment::{self, CancelOutcome};
use crate::models::enums::StatusTab;
use crate::models::Appointment;

#[derive(Deserialize)]
pub struct TabQuery {
    #[serde(default)]
    pub tab: StatusTab,
}

#[derive(Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<Appointment>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<TabQuery>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let appointments =
        appointment::list_appointments(ctx.core.store(), session.user_id(), query.tab)?;
    Ok(Json(AppointmentsResponse { appointments }))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(appointment::get_appointment(
        ctx.core.store(),
        &appointment_id,
        session.user_id(),
    )?))
}

/// A refusal is a normal 200 response carrying the explanation.
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(appointment_id): Path<String>,
) -> Result<Json<CancelOutcome>, ApiError> {
    Ok(Json(appointment::cancel_appointment(
        ctx.core.store(),
        &appointment_id,
        session.user_id(),
        now(),
    )?))
}
