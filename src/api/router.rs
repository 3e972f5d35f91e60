//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`. Everything except health, sign-up and
//! sign-in sits behind bearer auth and is served with `Cache-Control: no-store`.

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    let protected = Router::new()
        .route("/auth/sign-out", post(endpoints::auth::sign_out))
        .route("/auth/me", get(endpoints::auth::me))
        .route("/auth/child", put(endpoints::auth::select_child))
        .route("/auth/push-token", post(endpoints::auth::register_push_token))
        .route("/midwives", get(endpoints::midwives::list))
        .route("/midwives/:id", get(endpoints::midwives::profile))
        .route("/midwives/:id/days", get(endpoints::midwives::days))
        .route("/midwives/:id/slots", get(endpoints::midwives::slots))
        .route("/midwives/:id/book", post(endpoints::midwives::book))
        .route("/appointments", get(endpoints::appointments::list))
        .route("/appointments/:id", get(endpoints::appointments::get))
        .route("/appointments/:id/cancel", post(endpoints::appointments::cancel))
        .route(
            "/children",
            get(endpoints::children::list).post(endpoints::children::add),
        )
        .route(
            "/children/:id",
            get(endpoints::children::detail).delete(endpoints::children::delete),
        )
        .route(
            "/children/:id/measurements",
            post(endpoints::children::add_measurement),
        )
        .route(
            "/children/:id/measurements/:kind",
            get(endpoints::children::history),
        )
        .route("/vaccines", get(endpoints::vaccines::progress))
        .route("/vaccines/:id", get(endpoints::vaccines::detail))
        .route("/records", get(endpoints::vaccines::records))
        .route("/records/summary", get(endpoints::vaccines::summary))
        .route("/records/:id", get(endpoints::vaccines::record))
        .route("/reminders", get(endpoints::reminders::list))
        .route("/reminders/count", get(endpoints::reminders::count))
        .route("/reminders/:id/confirm", post(endpoints::reminders::confirm))
        .route(
            "/reminders/:id/reschedule",
            post(endpoints::reminders::reschedule),
        )
        .route(
            "/reminders/:id/notification",
            post(endpoints::reminders::toggle_notification),
        )
        .route("/events", get(endpoints::events::list))
        .route("/events/:id", get(endpoints::events::detail))
        .route("/events/:id/join", post(endpoints::events::join))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/sign-up", post(endpoints::auth::sign_up))
        .route("/auth/sign-in", post(endpoints::auth::sign_in))
        .with_state(ctx);

    Router::new()
        .nest("/api", protected.merge(unprotected))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, Response, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::db::{self, collections, to_fields, DataStore};
    use crate::models::{Midwife, Session, VaccinationSession, VaccineSchedule};

    fn test_core() -> Arc<CoreState> {
        Arc::new(CoreState::open_in_memory(1_000).unwrap())
    }

    fn make_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        match body {
            Some(b) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        if bytes.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }

    async fn sign_up(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            make_request(
                "POST",
                "/api/auth/sign-up",
                None,
                Some(json!({
                    "name": "Dilani Perera",
                    "phone": "0771234567",
                    "email": email,
                    "password": "secret-pass",
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    async fn add_and_select_child(app: &Router, token: &str) -> String {
        let (status, child) = send(
            app,
            make_request(
                "POST",
                "/api/children",
                Some(token),
                Some(json!({"name": "Sanduni", "gender": "Female", "birthday": "2025-08-03"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let child_id = child["id"].as_str().unwrap().to_string();

        let (status, ctx) = send(
            app,
            make_request("PUT", "/api/auth/child", Some(token), Some(json!({"childId": child_id}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ctx["selectedChildId"], child_id.as_str());
        child_id
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = api_router(test_core());
        let (status, body) = send(&app, make_request("GET", "/api/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["storeOk"], true);
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let app = api_router(test_core());
        let (status, body) = send(&app, make_request("GET", "/api/children", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_REQUIRED");

        let (status, _) = send(&app, make_request("GET", "/api/children", Some("bogus"), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sign_in_and_out_cycle() {
        let app = api_router(test_core());
        let first = sign_up(&app, "mum@clinic.lk").await;

        let response = app
            .clone()
            .oneshot(make_request("GET", "/api/auth/me", Some(&first), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");

        let (status, _) = send(&app, make_request("POST", "/api/auth/sign-out", Some(&first), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, make_request("GET", "/api/auth/me", Some(&first), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            make_request(
                "POST",
                "/api/auth/sign-in",
                None,
                Some(json!({"email": "mum@clinic.lk", "password": "wrong-pass"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");

        let (status, body) = send(
            &app,
            make_request(
                "POST",
                "/api/auth/sign-in",
                None,
                Some(json!({"email": "mum@clinic.lk", "password": "secret-pass"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let second = body["token"].as_str().unwrap();
        let (status, _) = send(&app, make_request("GET", "/api/auth/me", Some(second), None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn duplicate_sign_up_conflicts() {
        let app = api_router(test_core());
        sign_up(&app, "mum@clinic.lk").await;
        let (status, _) = send(
            &app,
            make_request(
                "POST",
                "/api/auth/sign-up",
                None,
                Some(json!({"name": "X", "phone": "1", "email": "MUM@clinic.lk", "password": "secret-pass"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn child_scoped_routes_need_selection() {
        let app = api_router(test_core());
        let token = sign_up(&app, "mum@clinic.lk").await;

        let (status, body) = send(&app, make_request("GET", "/api/reminders", Some(&token), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "NO_CHILD_SELECTED");

        let (status, body) = send(&app, make_request("GET", "/api/reminders/count", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);

        let (status, _) = send(
            &app,
            make_request("PUT", "/api/auth/child", Some(&token), Some(json!({"childId": "not-mine"}))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reminder_confirm_flow() {
        let core = test_core();
        let app = api_router(core.clone());
        let token = sign_up(&app, "mum@clinic.lk").await;
        let child_id = add_and_select_child(&app, &token).await;

        let store = core.store();
        db::insert_schedule_entry(
            store,
            "bcg",
            &VaccineSchedule {
                vaccine_name: Some("BCG".into()),
                age_due: Some("At birth".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let session = VaccinationSession {
            selected_vaccine: Some("bcg".into()),
            selected_participants: vec![child_id.clone()],
            date: chrono::NaiveDate::from_ymd_opt(2030, 1, 7),
            selected_center: Some("Matara MOH".into()),
            ..Default::default()
        };
        store
            .set_document(
                &format!("{}/bcg/{}", collections::SCHEDULES, collections::SESSIONS),
                "s1",
                to_fields(&session).unwrap(),
            )
            .unwrap();

        let (_, body) = send(&app, make_request("GET", "/api/reminders", Some(&token), None)).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["reminders"][0]["vaccineName"], "BCG");

        let (status, _) = send(
            &app,
            make_request("POST", "/api/reminders/s1/reschedule", Some(&token), Some(json!({"reason": " "}))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = send(&app, make_request("POST", "/api/reminders/s1/notification", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notificationEnabled"], true);

        let (status, record) = send(&app, make_request("POST", "/api/reminders/s1/confirm", Some(&token), None)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record["status"], "Scheduled");

        let (_, body) = send(&app, make_request("GET", "/api/reminders/count", Some(&token), None)).await;
        assert_eq!(body["count"], 0);
        let (status, _) = send(&app, make_request("POST", "/api/reminders/s1/confirm", Some(&token), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&app, make_request("GET", "/api/vaccines?tab=Scheduled", Some(&token), None)).await;
        assert_eq!(body["vaccines"][0]["status"], "Scheduled");
        assert_eq!(body["childId"], child_id.as_str());
        assert!(body.get("child_id").is_none());

        let (_, body) = send(&app, make_request("GET", "/api/records/summary", Some(&token), None)).await;
        assert_eq!(body["scheduled"], 1);

        let record_id = record["id"].as_str().unwrap();
        let (status, _) = send(&app, make_request("GET", &format!("/api/records/{record_id}"), Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        let stranger = sign_up(&app, "other@clinic.lk").await;
        let (status, _) = send(&app, make_request("GET", &format!("/api/records/{record_id}"), Some(&stranger), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn booking_and_cancellation_flow() {
        let core = test_core();
        let app = api_router(core.clone());
        let token = sign_up(&app, "mum@clinic.lk").await;

        let day = chrono::NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
        let midwife_id = db::insert_midwife(
            core.store(),
            &Midwife {
                name: Some("Kumari Silva".into()),
                sessions: vec![Session {
                    date: Some(day),
                    start_time: Some("9:00 AM".into()),
                    end_time: Some("10:00 AM".into()),
                    no_of_slots: Some(2),
                    ..Default::default()
                }],
                ..Default::default()
            },
        )
        .unwrap();

        let slots_uri = format!("/api/midwives/{midwife_id}/slots?date=2030-01-07");
        let (_, body) = send(&app, make_request("GET", &slots_uri, Some(&token), None)).await;
        assert_eq!(body["slots"], json!(["9:00 AM", "9:30 AM"]));

        let book_uri = format!("/api/midwives/{midwife_id}/book");
        let booking = json!({"date": "2030-01-07", "timeSlot": "9:30 AM"});
        let (status, appt) = send(&app, make_request("POST", &book_uri, Some(&token), Some(booking.clone()))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(appt["status"], "Scheduled");

        let (status, _) = send(&app, make_request("POST", &book_uri, Some(&token), Some(booking))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = send(&app, make_request("GET", &slots_uri, Some(&token), None)).await;
        assert_eq!(body["slots"], json!(["9:00 AM"]));

        let (_, body) = send(&app, make_request("GET", "/api/appointments?tab=Scheduled", Some(&token), None)).await;
        assert_eq!(body["appointments"].as_array().unwrap().len(), 1);

        let cancel_uri = format!("/api/appointments/{}/cancel", appt["id"].as_str().unwrap());
        let (status, body) = send(&app, make_request("POST", &cancel_uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "cancelled");
        assert_eq!(body["appointment"]["status"], "Cancelled");

        let (_, body) = send(&app, make_request("GET", &slots_uri, Some(&token), None)).await;
        assert_eq!(body["slots"], json!(["9:00 AM", "9:30 AM"]));
    }

    #[tokio::test]
    async fn deleting_selected_child_clears_selection() {
        let app = api_router(test_core());
        let token = sign_up(&app, "mum@clinic.lk").await;
        let child_id = add_and_select_child(&app, &token).await;

        let (status, _) = send(
            &app,
            make_request("DELETE", &format!("/api/children/{child_id}"), Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, me) = send(&app, make_request("GET", "/api/auth/me", Some(&token), None)).await;
        assert!(me["selectedChildId"].is_null());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = api_router(test_core());
        let (status, _) = send(&app, make_request("GET", "/nonexistent", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
