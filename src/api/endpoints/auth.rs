//! Account and session endpoints.
//!
//! `POST /api/auth/sign-up`, `POST /api/auth/sign-in`: unprotected, return a bearer token
//! `POST /api/auth/sign-out`: drops the caller's session
//! `GET  /api/auth/me`: the caller's context
//! `PUT  /api/auth/child`: select the active child
//! `POST /api/auth/push-token`: register the device's push token

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{generate_token, hash_token, ApiContext, AuthSession};
use crate::core_state::UserContext;
use crate::identity::{AuthUser, SignUpRequest};
use crate::notifications::NotifyError;

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserContext,
}

fn open_session(ctx: &ApiContext, user: &AuthUser) -> Result<SessionResponse, ApiError> {
    let token = generate_token();
    ctx.core.begin_session(hash_token(&token), user)?;
    Ok(SessionResponse {
        token,
        user: UserContext::new(user),
    })
}

/// `POST /api/auth/sign-up`
pub async fn sign_up(
    State(ctx): State<ApiContext>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let user = ctx.core.identity().sign_up(&request)?;
    Ok((StatusCode::CREATED, Json(open_session(&ctx, &user)?)))
}

/// `POST /api/auth/sign-in`
pub async fn sign_in(
    State(ctx): State<ApiContext>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = ctx.core.identity().sign_in(&request.email, &request.password)?;
    Ok(Json(open_session(&ctx, &user)?))
}

/// `POST /api/auth/sign-out`
pub async fn sign_out(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
) -> Result<StatusCode, ApiError> {
    ctx.core.end_session(&session.token_hash)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`
pub async fn me(Extension(session): Extension<AuthSession>) -> Json<UserContext> {
    Json(session.user)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectChildRequest {
    pub child_id: String,
}

/// `PUT /api/auth/child`
pub async fn select_child(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Json(request): Json<SelectChildRequest>,
) -> Result<Json<UserContext>, ApiError> {
    let user = ctx.core.select_child(&session.token_hash, &request.child_id)?;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct PushTokenRequest {
    pub token: String,
}

/// `POST /api/auth/push-token`: a rejected token is a client error; any
/// other notifier failure is logged and the request still succeeds.
pub async fn register_push_token(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<AuthSession>,
    Json(request): Json<PushTokenRequest>,
) -> Result<StatusCode, ApiError> {
    match ctx
        .core
        .notifier()
        .register_device(session.user_id(), &request.token)
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(NotifyError::InvalidToken) => Err(ApiError::BadRequest("Invalid device token".into())),
        Err(e) => {
            tracing::warn!(error = %e, "Push token registration failed");
            Ok(StatusCode::ACCEPTED)
        }
    }
}
