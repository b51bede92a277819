// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Applied to whole router subtrees with
//! `route_layer(middleware::from_fn_with_state(state, protect))`. The
//! resolved [`Authenticated`] context is stored in the request extensions,
//! where the [`Auth`](super::Auth) and [`AdminOnly`](super::AdminOnly)
//! extractors pick it up.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::context::{Anonymous, Authenticated};
use crate::state::AppState;

/// Reject the request unless it carries a valid session.
pub async fn protect(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let anonymous = Anonymous::from_headers(request.headers());
    match state.auth.protect(&anonymous) {
        Ok(authenticated) => {
            request.extensions_mut().insert::<Authenticated>(authenticated);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
