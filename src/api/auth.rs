// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signup, login and password endpoints.
//!
//! Every endpoint that opens a session answers with the token in the body
//! and in an http-only `jwt` cookie.

use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::{
    auth::{context::LOGGED_OUT, context::SESSION_COOKIE, Auth, Session},
    error::{ApiError, ErrorBody},
    models::{
        ForgotPasswordRequest, LoginRequest, MessageResponse, ResetPasswordRequest,
        SessionResponse, SignupRequest, UpdatePasswordRequest, UserData,
    },
    state::AppState,
};

use super::JsonBody;

/// Lifetime of the logout cookie, in seconds.
const LOGOUT_COOKIE_SECS: i64 = 10;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

type SessionReply = (StatusCode, [(HeaderName, String); 1], Json<SessionResponse>);

/// `Set-Cookie` value for the session cookie.
pub fn session_cookie(value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn session_reply(state: &AppState, status: StatusCode, session: Session) -> SessionReply {
    let max_age = state
        .config
        .auth
        .cookie_ttl_days
        .saturating_mul(SECONDS_PER_DAY);
    let cookie = session_cookie(&session.token, max_age, state.secure_cookies());
    (
        status,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            status: "success",
            token: session.token,
            data: UserData { user: session.user },
        }),
    )
}

/// Create an account and sign it in.
#[utoipa::path(
    post,
    path = "/api/v1/users/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SignupRequest>,
) -> Result<SessionReply, ApiError> {
    let session = state.auth.signup(request).await?;
    Ok(session_reply(&state, StatusCode::CREATED, session))
}

/// Exchange email and password for a session.
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 400, description = "Email or password missing", body = ErrorBody),
        (status = 401, description = "Incorrect email or password", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<SessionReply, ApiError> {
    let session = state.auth.login(request).await?;
    Ok(session_reply(&state, StatusCode::OK, session))
}

/// Overwrite the session cookie with a short-lived placeholder.
#[utoipa::path(
    get,
    path = "/api/v1/users/logout",
    tag = "Auth",
    responses((status = 200, description = "Cookie cleared"))
)]
pub async fn logout(
    State(state): State<AppState>,
) -> (StatusCode, [(HeaderName, String); 1], Json<Value>) {
    let cookie = session_cookie(LOGGED_OUT, LOGOUT_COOKIE_SECS, state.secure_cookies());
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "status": "success" })),
    )
}

/// Email a single-use reset link.
#[utoipa::path(
    post,
    path = "/api/v1/users/forgotPassword",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent", body = MessageResponse),
        (status = 404, description = "No account with that email", body = ErrorBody),
        (status = 500, description = "Email could not be sent", body = ErrorBody)
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.forgot_password(request).await?;
    Ok(Json(MessageResponse {
        status: "success",
        message: "Token sent to email".to_string(),
    }))
}

/// Set a new password with a reset secret and sign in.
#[utoipa::path(
    patch,
    path = "/api/v1/users/resetPassword/{token}",
    tag = "Auth",
    params(("token" = String, Path, description = "Reset secret from the email")),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = SessionResponse),
        (status = 400, description = "Secret invalid or expired, or passwords rejected", body = ErrorBody)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    JsonBody(request): JsonBody<ResetPasswordRequest>,
) -> Result<SessionReply, ApiError> {
    let session = state.auth.reset_password(&token, request).await?;
    Ok(session_reply(&state, StatusCode::OK, session))
}

/// Change the password of the signed-in account. Earlier sessions stop
/// working.
#[utoipa::path(
    patch,
    path = "/api/v1/users/updateMyPassword",
    tag = "Auth",
    security(("bearer" = [])),
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = SessionResponse),
        (status = 401, description = "Current password is wrong", body = ErrorBody)
    )
)]
pub async fn update_my_password(
    Auth(user): Auth,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UpdatePasswordRequest>,
) -> Result<SessionReply, ApiError> {
    let session = state.auth.update_password(&user, request).await?;
    Ok(session_reply(&state, StatusCode::OK, session))
}
