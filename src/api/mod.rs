// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface, mounted under `/api/v1`.
//!
//! Public routes (signup, login, password recovery, health) sit next to a
//! protected subtree guarded by the [`protect`] middleware. Admin routes
//! additionally take the [`AdminOnly`](crate::auth::AdminOnly) extractor.

use axum::{
    extract::{DefaultBodyLimit, FromRequest},
    http::{header, HeaderValue, Method, Uri},
    middleware,
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::middleware::protect,
    config::AppConfig,
    error::{ApiError, ErrorBody},
    models::{
        AdminUpdateUserRequest, CreateNoteRequest, CreateNotebookRequest, ForgotPasswordRequest,
        Location, LoginRequest, MessageResponse, ResetPasswordRequest, SessionResponse,
        SignupRequest, UpdateMeRequest, UpdateNoteRequest, UpdateNotebookRequest,
        UpdatePasswordRequest, UserData, UserResponse,
    },
    query::{strip_internal, CollectionSchema, NoteStats, NotebookNoteCount},
    state::AppState,
    storage::{Note, Notebook},
};

pub mod auth;
pub mod health;
pub mod notebooks;
pub mod notes;
pub mod users;

/// Largest accepted request body (5 MB).
pub const BODY_LIMIT: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct DataBody<T> {
    pub data: T,
}

/// `{"status":"success","results":n,"data":{"data":[...]}}`
#[derive(Debug, Clone, Serialize)]
pub struct ListEnvelope<T> {
    pub status: &'static str,
    pub results: usize,
    pub data: DataBody<Vec<T>>,
}

impl<T> ListEnvelope<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            status: "success",
            results: rows.len(),
            data: DataBody { data: rows },
        }
    }
}

/// `{"status":"success","data":{"data":{...}}}`
#[derive(Debug, Clone, Serialize)]
pub struct ItemEnvelope<T> {
    pub status: &'static str,
    pub data: DataBody<T>,
}

impl<T> ItemEnvelope<T> {
    pub fn new(item: T) -> Self {
        Self {
            status: "success",
            data: DataBody { data: item },
        }
    }
}

/// JSON request body. Rejections (bad syntax, wrong content type, wrong
/// shape) are answered with the usual error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Serialize a record for a response, dropping fields clients never see.
pub(crate) fn public_document<T: Serialize>(
    record: &T,
    schema: &CollectionSchema,
) -> Result<Value, ApiError> {
    let document = serde_json::to_value(record)
        .map_err(|e| ApiError::internal(format!("response encoding failed: {e}")))?;
    Ok(strip_internal(document, schema))
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/users/signup", post(auth::signup))
        .route("/users/login", post(auth::login))
        .route("/users/logout", get(auth::logout))
        .route("/users/forgotPassword", post(auth::forgot_password))
        .route("/users/resetPassword/{token}", patch(auth::reset_password))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness));

    let protected_routes = Router::new()
        .route("/users/updateMyPassword", patch(auth::update_my_password))
        .route("/users/me", get(users::get_me))
        .route("/users/updateMe", patch(users::update_me))
        .route("/users/deleteMe", axum::routing::delete(users::delete_me))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/notebooks",
            get(notebooks::list_notebooks).post(notebooks::create_notebook),
        )
        .route(
            "/notebooks/{id}",
            get(notebooks::get_notebook)
                .patch(notebooks::update_notebook)
                .delete(notebooks::delete_notebook),
        )
        .route(
            "/notebooks/{id}/notes",
            get(notes::list_notebook_notes).post(notes::create_notebook_note),
        )
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route("/notes/favorites", get(notes::favorite_notes))
        .route("/notes/search-notes", get(notes::search_notes))
        .route("/notes/analytics", get(notes::note_analytics))
        .route(
            "/notes/{id}",
            get(notes::get_note)
                .patch(notes::update_note)
                .delete(notes::delete_note),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), protect));

    let cors = cors_layer(&state.config);

    Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Can't find {uri} on this server!"))
}

/// Exact-origin CORS with credentials, so the browser client can send the
/// session cookie.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match HeaderValue::from_str(&config.cors_origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = %config.cors_origin, "Ignoring unparsable CORS origin");
            layer
        }
    }
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup,
        auth::login,
        auth::logout,
        auth::forgot_password,
        auth::reset_password,
        auth::update_my_password,
        users::get_me,
        users::update_me,
        users::delete_me,
        users::list_users,
        users::create_user,
        users::get_user,
        users::update_user,
        users::delete_user,
        notebooks::list_notebooks,
        notebooks::create_notebook,
        notebooks::get_notebook,
        notebooks::update_notebook,
        notebooks::delete_notebook,
        notes::list_notes,
        notes::create_note,
        notes::list_notebook_notes,
        notes::create_notebook_note,
        notes::favorite_notes,
        notes::search_notes,
        notes::note_analytics,
        notes::get_note,
        notes::update_note,
        notes::delete_note,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            ErrorBody,
            UserResponse,
            UserData,
            SessionResponse,
            MessageResponse,
            SignupRequest,
            LoginRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            UpdatePasswordRequest,
            UpdateMeRequest,
            AdminUpdateUserRequest,
            Notebook,
            CreateNotebookRequest,
            UpdateNotebookRequest,
            Note,
            Location,
            CreateNoteRequest,
            UpdateNoteRequest,
            NoteStats,
            NotebookNoteCount,
            notes::AnalyticsResponse,
            health::HealthResponse,
            health::HealthChecks
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Signup, login and password recovery"),
        (name = "Users", description = "Account management"),
        (name = "Notebooks", description = "Notebook management"),
        (name = "Notes", description = "Notes, search and analytics"),
        (name = "Health", description = "Service health")
    )
)]
struct ApiDoc;

#[cfg(test)]
pub(crate) mod testing {
    use crate::auth::{Anonymous, Authenticated, AuthenticatedUser};
    use crate::models::SignupRequest;
    use crate::state::AppState;

    /// Sign up `email` and return the authenticated account.
    pub(crate) async fn signed_up(state: &AppState, email: &str) -> AuthenticatedUser {
        let session = state
            .auth
            .signup(SignupRequest {
                name: Some("Alice".into()),
                email: Some(email.into()),
                password: Some("secret123".into()),
                password_confirm: Some("secret123".into()),
            })
            .await
            .unwrap();
        state
            .auth
            .protect(&Anonymous::new(Some(session.token)))
            .map(Authenticated::into_user)
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::for_tests());
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn unknown_routes_get_a_json_404() {
        let response = router(AppState::for_tests())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/nowhere")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "fail");
        assert_eq!(json["error"], "Can't find /api/v1/nowhere on this server!");
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let response = router(AppState::for_tests())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn protected_routes_require_a_session() {
        for uri in ["/api/v1/notes", "/api/v1/notebooks", "/api/v1/users/me"] {
            let response = router(AppState::for_tests())
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn malformed_bodies_use_the_error_envelope() {
        let cases = [
            (Some("application/json"), "{not json", StatusCode::BAD_REQUEST, "invalid_json"),
            (None, r#"{"email":"a@x.com"}"#, StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type"),
        ];
        for (content_type, body, status, code) in cases {
            let mut request = Request::builder()
                .method(Method::POST)
                .uri("/api/v1/users/signup");
            if let Some(content_type) = content_type {
                request = request.header(header::CONTENT_TYPE, content_type);
            }
            let response = router(AppState::for_tests())
                .oneshot(request.body(Body::from(body)).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), status);
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["status"], "fail");
            assert_eq!(json["error_code"], code);
            assert!(json["error"].is_string());
        }
    }

    #[test]
    fn openapi_lists_note_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/notes"));
        assert!(doc.paths.paths.contains_key("/api/v1/notes/{id}"));
    }
}
