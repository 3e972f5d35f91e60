//! Midwife directory and booking endpoints.
//!
//! - `GET  /api/midwives?search=`: directory
//! - `GET  /api/midwives/:id`: profile
//! - `GET  /api/midwives/:id/days`: booking window day picker
//! - `GET  /api/midwives/:id/slots?date=&sessionType=&location=`: free slots
//! - `POST /api/midwives/:id/book`: book a slot

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{today, ApiContext, AuthSession};
use crate::appointment::{self, Booker, BookingRequest, MidwifeSummary};
use crate::models::Appointment;
use crate::slots::{DayOption, SessionFilter};

#[derive(Deserialize)]
pub struct DirectoryQuery {
    pub search: Option<String>,
}

#[derive(Serialize)]
pub struct MidwivesResponse {
    pub midwives: Vec<MidwifeSummary>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<MidwivesResponse>, ApiError> {
    let midwives = appointment::list_midwives(ctx.core.store(), query.search.as_deref(), today())?;
    Ok(Json(MidwivesResponse { midwives }))
}

pub async fn profile(
    State(ctx): State<ApiContext>,
    Path(midwife_id): Path<String>,
) -> Result<Json<MidwifeSummary>, ApiError> {
    Ok(Json(appointment::midwife_profile(
        ctx.core.store(),
        &midwife_id,
        today(),
    )?))
}

pub async fn days(
    State(ctx): State<ApiContext>,
    Path(midwife_id): Path<String>,
) -> Result<Json<Vec<DayOption>>, ApiError> {
    Ok(Json(appointment::booking_days(
        ctx.core.store(),
        &midwife_id,
        today(),
    )?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub date: NaiveDate,
    pub session_type: Option<String>,
    pub location: Option<String>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub date: NaiveDate,
    pub slots: Vec<String>,
}

pub async fn slots(
    State(ctx): State<ApiContext>,
    Path(midwife_id): Path<String>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<SlotsResponse>, ApiError> {
    let filter = SessionFilter {
        session_type: query.session_type,
        location: query.location,
    };
    let slots = appointment::available_slots(ctx.core.store(), &midwife_id, query.date, &filter)?;
    Ok(Json(SlotsResponse {
        date: query.date,
        slots,
    }))
}

/// Books for the signed-in user; the selected child, if any, is attached.
pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(midwife_id): Path<String>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    if request.date < today() {
        return Err(ApiError::Validation("Cannot book a date in the past.".into()));
    }
    let booker = Booker {
        user_id: session.user.user_id.clone(),
        child_id: session.user.selected_child_id.clone(),
    };
    let appointment = appointment::book_slot(ctx.core.store(), &midwife_id, &request, &booker)?;
    Ok((StatusCode::CREATED, Json(appointment)))
}
