//! Community event endpoints.
//!
//! - `GET  /api/events?title=&date=&month=&year=&status=`
//! - `GET  /api/events/:id`
//! - `POST /api/events/:id/join`

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{today, ApiContext, AuthSession};
use crate::events::{self, EventDetail, EventQuery, EventSummary};

#[derive(Serialize)]
pub struct EventsResponse {
    pub events: Vec<EventSummary>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<EventQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let events = events::list_events(ctx.core.store(), &query, today())?;
    Ok(Json(EventsResponse { events }))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(event_id): Path<String>,
) -> Result<Json<EventDetail>, ApiError> {
    Ok(Json(events::event_detail(
        ctx.core.store(),
        &event_id,
        session.user_id(),
        today(),
    )?))
}

pub async fn join(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Path(event_id): Path<String>,
) -> Result<Json<EventDetail>, ApiError> {
    events::join_event(ctx.core.store(), &event_id, session.user_id(), today())?;
    Ok(Json(events::event_detail(
        ctx.core.store(),
        &event_id,
        session.user_id(),
        today(),
    )?))
}
