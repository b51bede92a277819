// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end flows through the full router.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use mindful_server::{
    api::router,
    auth::Role,
    config::AppConfig,
    mail::OutboxMailer,
    state::AppState,
    storage::UserRepository,
};

struct TestApp {
    app: Router,
    state: AppState,
    outbox: Arc<OutboxMailer>,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        let mut config = AppConfig::development();
        config.auth.bcrypt_cost = 4;
        config.public_base_url = "https://notes.example.com".parse().unwrap();
        let outbox = Arc::new(OutboxMailer::new());
        let state = AppState::in_memory(config, outbox.clone()).unwrap();
        Self {
            app: router(state.clone()),
            state,
            outbox,
        }
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn signup(&self, email: &str, password: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                "/api/v1/users/signup",
                None,
                Some(json!({
                    "name": "Test User",
                    "email": email,
                    "password": password,
                    "passwordConfirm": password,
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.body["token"].as_str().unwrap().to_string()
    }

    async fn login(&self, email: &str, password: &str) -> Reply {
        self.send(
            Method::POST,
            "/api/v1/users/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    async fn notebook(&self, token: &str, title: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                "/api/v1/notebooks",
                Some(token),
                Some(json!({ "title": title })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.body["data"]["data"]["id"].as_str().unwrap().to_string()
    }

    async fn note(&self, token: &str, notebook: &str, title: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                &format!("/api/v1/notebooks/{notebook}/notes"),
                Some(token),
                Some(json!({ "title": title })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.body["data"]["data"]["id"].as_str().unwrap().to_string()
    }
}

/// Pull the reset secret out of the last email in the outbox.
fn reset_secret(outbox: &OutboxMailer) -> String {
    let email = outbox.last().expect("reset email sent");
    let start = email.body.find("resetPassword/").expect("reset link") + "resetPassword/".len();
    email.body[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect()
}

fn ids(reply: &Reply) -> Vec<String> {
    reply.body["data"]["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn password_recovery_flow() {
    let app = TestApp::new();
    app.signup("ann@example.com", "original-pass").await;

    let reply = app.login("ann@example.com", "wrong-pass").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app
        .send(
            Method::POST,
            "/api/v1/users/forgotPassword",
            None,
            Some(json!({ "email": "ann@example.com" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Token sent to email");

    let secret = reset_secret(&app.outbox);
    assert_eq!(secret.len(), 64);
    assert!(app
        .outbox
        .last()
        .unwrap()
        .body
        .contains("https://notes.example.com/api/v1/users/resetPassword/"));

    let reset_uri = format!("/api/v1/users/resetPassword/{secret}");
    let new_password = json!({ "password": "brand-new-pass", "passwordConfirm": "brand-new-pass" });
    let reply = app
        .send(Method::PATCH, &reset_uri, None, Some(new_password.clone()))
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert!(reply.body["token"].is_string());

    // Single use
    let reply = app.send(Method::PATCH, &reset_uri, None, Some(new_password)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    assert_eq!(
        app.login("ann@example.com", "original-pass").await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.login("ann@example.com", "brand-new-pass").await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.signup("ann@example.com", "original-pass").await;

    let unknown = app.login("nobody@example.com", "original-pass").await;
    let wrong = app.login("ann@example.com", "wrong-pass").await;

    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, wrong.status);
    assert_eq!(unknown.body, wrong.body);
}

#[tokio::test]
async fn session_cookie_authenticates_and_logout_clears_it() {
    let app = TestApp::new();
    let token = app.signup("ann@example.com", "original-pass").await;

    let request = Request::builder()
        .uri("/api/v1/users/me")
        .header(header::COOKIE, format!("jwt={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let reply = app.send(Method::GET, "/api/v1/users/logout", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("jwt=loggedout;"));

    let request = Request::builder()
        .uri("/api/v1/users/me")
        .header(header::COOKIE, "jwt=loggedout")
        .body(Body::empty())
        .unwrap();
    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_change_revokes_older_sessions() {
    let app = TestApp::new();
    let old_token = app.signup("ann@example.com", "original-pass").await;

    // Token issue times are compared in milliseconds.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let reply = app
        .send(
            Method::PATCH,
            "/api/v1/users/updateMyPassword",
            Some(&old_token),
            Some(json!({
                "passwordCurrent": "original-pass",
                "password": "brand-new-pass",
                "passwordConfirm": "brand-new-pass",
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let new_token = reply.body["token"].as_str().unwrap().to_string();

    let reply = app.send(Method::GET, "/api/v1/users/me", Some(&old_token), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app.send(Method::GET, "/api/v1/users/me", Some(&new_token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["data"]["email"], "ann@example.com");
}

#[tokio::test]
async fn resources_are_isolated_between_owners() {
    let app = TestApp::new();
    let ann = app.signup("ann@example.com", "original-pass").await;
    let bob = app.signup("bob@example.com", "original-pass").await;

    let anns_notebook = app.notebook(&ann, "Ann's").await;
    let anns_note = app.note(&ann, &anns_notebook, "private").await;
    let bobs_notebook = app.notebook(&bob, "Bob's").await;
    app.note(&bob, &bobs_notebook, "bob's note").await;

    let reply = app.send(Method::GET, "/api/v1/notes", Some(&bob), None).await;
    assert_eq!(reply.body["results"], 1);

    let reply = app
        .send(Method::GET, &format!("/api/v1/notes/{anns_note}"), Some(&bob), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app
        .send(
            Method::GET,
            &format!("/api/v1/notebooks/{anns_notebook}/notes"),
            Some(&bob),
            None,
        )
        .await;
    assert_eq!(reply.body["results"], 0);

    let reply = app
        .send(
            Method::DELETE,
            &format!("/api/v1/notebooks/{anns_notebook}"),
            Some(&bob),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app
        .send(
            Method::DELETE,
            &format!("/api/v1/notebooks/{anns_notebook}"),
            Some(&ann),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert_eq!(reply.body, Value::Null);

    let reply = app
        .send(Method::GET, &format!("/api/v1/notes/{anns_note}"), Some(&ann), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pagination_filters_and_projection() {
    let app = TestApp::new();
    let ann = app.signup("ann@example.com", "original-pass").await;
    let notebook = app.notebook(&ann, "Work").await;
    for i in 0..5 {
        app.note(&ann, &notebook, &format!("note {i}")).await;
    }

    let all = app
        .send(Method::GET, "/api/v1/notes?sort=title", Some(&ann), None)
        .await;
    assert_eq!(all.body["results"], 5);
    let all_ids = ids(&all);

    let first = app
        .send(Method::GET, "/api/v1/notes?sort=title&limit=2&page=1", Some(&ann), None)
        .await;
    let second = app
        .send(Method::GET, "/api/v1/notes?sort=title&limit=2&page=2", Some(&ann), None)
        .await;
    assert_eq!(ids(&first), all_ids[..2].to_vec());
    assert_eq!(ids(&second), all_ids[2..4].to_vec());

    let projected = app
        .send(Method::GET, "/api/v1/notes?fields=title&limit=1", Some(&ann), None)
        .await;
    let row = &projected.body["data"]["data"][0];
    assert!(row.get("title").is_some());
    assert!(row.get("id").is_some());
    assert!(row.get("notebook").is_none());

    let filtered = app
        .send(Method::GET, "/api/v1/notes?title=note%203", Some(&ann), None)
        .await;
    assert_eq!(filtered.body["results"], 1);

    let bad = app
        .send(Method::GET, "/api/v1/notes?createdAt%5Bgte%5D=yesterday", Some(&ann), None)
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_require_the_admin_role() {
    let app = TestApp::new();
    let member = app.signup("member@example.com", "original-pass").await;
    app.signup("admin@example.com", "original-pass").await;

    let reply = app.send(Method::GET, "/api/v1/users", Some(&member), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let users = UserRepository::new(app.state.store.as_ref());
    let admin = users
        .find_active_by_email("admin@example.com")
        .unwrap()
        .unwrap();
    users
        .update_with(&admin.id, |user| {
            user.role = Role::Admin;
            true
        })
        .unwrap();
    let admin_token = app
        .login("admin@example.com", "original-pass")
        .await
        .body["token"]
        .as_str()
        .unwrap()
        .to_string();

    let reply = app
        .send(Method::GET, "/api/v1/users", Some(&admin_token), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["results"], 2);
    assert!(reply.body["data"]["data"][0].get("passwordHash").is_none());

    let reply = app
        .send(
            Method::POST,
            "/api/v1/users",
            Some(&admin_token),
            Some(json!({ "name": "x" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply.body["error"],
        "This route is not defined, please use /signup instead"
    );
}

#[tokio::test]
async fn favorites_search_and_analytics() {
    let app = TestApp::new();
    let ann = app.signup("ann@example.com", "original-pass").await;
    let work = app.notebook(&ann, "Work").await;
    let home = app.notebook(&ann, "Home").await;
    let starred = app.note(&ann, &work, "starred").await;
    app.note(&ann, &work, "plain").await;
    app.note(&ann, &home, "chores").await;

    let reply = app
        .send(
            Method::PATCH,
            &format!("/api/v1/notes/{starred}"),
            Some(&ann),
            Some(json!({ "favorite": true, "content": "remember the milk" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);

    let reply = app
        .send(Method::GET, "/api/v1/notes/favorites", Some(&ann), None)
        .await;
    assert_eq!(ids(&reply), vec![starred.clone()]);

    let reply = app
        .send(Method::GET, "/api/v1/notes/search-notes?search=milk", Some(&ann), None)
        .await;
    assert_eq!(ids(&reply), vec![starred]);

    let reply = app
        .send(Method::GET, "/api/v1/notes/analytics", Some(&ann), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["totalNumNotes"], 3);
    assert_eq!(
        reply.body["data"]["stats"],
        json!([
            { "notebookTitle": "Home", "numberOfNotes": 1 },
            { "notebookTitle": "Work", "numberOfNotes": 2 }
        ])
    );
}
