// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{
    context::{Anonymous, Authenticated, Authorized},
    AuthError, AuthenticatedUser, Role,
};
use crate::state::AppState;

/// Resolve the request's session, reusing the result of the `protect`
/// middleware when it already ran.
fn authenticate(parts: &mut Parts, state: &AppState) -> Result<Authenticated, AuthError> {
    if let Some(authenticated) = parts.extensions.get::<Authenticated>() {
        return Ok(authenticated.clone());
    }

    let authenticated = state.auth.protect(&Anonymous::from_headers(&parts.headers))?;
    parts.extensions.insert(authenticated.clone());
    Ok(authenticated)
}

/// Extractor for authenticated users.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_notebooks(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<ListEnvelope<Value>>, ApiError> {
///     // user.user_id scopes every query
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Auth(authenticate(parts, state)?.into_user()))
    }
}

/// Extractor that requires the admin role.
pub struct AdminOnly(pub Authorized);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)?
            .restrict_to(&[Role::Admin])
            .map(AdminOnly)
    }
}
