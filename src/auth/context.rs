// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request authentication stages.
//!
//! A request moves through three immutable values:
//!
//! ```text
//! Anonymous ──protect──▶ Authenticated ──restrict_to──▶ Authorized
//! ```
//!
//! Each stage is produced only by the step before it, so holding an
//! `Authorized` proves both checks ran.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum_extra::extract::CookieJar;

use super::{claims::SessionClaims, AuthError, AuthenticatedUser, Role};

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "jwt";

/// Value written to the session cookie on logout.
pub const LOGGED_OUT: &str = "loggedout";

/// Credentials presented with a request, not yet verified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Anonymous {
    token: Option<String>,
}

impl Anonymous {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Bearer header first, then the session cookie.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        let token = bearer.or_else(|| {
            CookieJar::from_headers(headers)
                .get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_string())
                .filter(|value| value != LOGGED_OUT)
        });

        Self::new(token)
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// A verified session bound to an active account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    user: AuthenticatedUser,
    claims: SessionClaims,
}

impl Authenticated {
    pub(crate) fn new(user: AuthenticatedUser, claims: SessionClaims) -> Self {
        Self { user, claims }
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }

    pub fn into_user(self) -> AuthenticatedUser {
        self.user
    }

    /// Admit the request only if the account's role is in `allowed`.
    pub fn restrict_to(self, allowed: &[Role]) -> Result<Authorized, AuthError> {
        let role = self.user.role;
        if allowed.contains(&role) {
            Ok(Authorized {
                user: self.user,
                granted: role,
            })
        } else {
            tracing::info!(
                target: "audit",
                user_id = %self.user.user_id,
                role = %self.user.role,
                "Role not permitted"
            );
            Err(AuthError::InsufficientPermissions)
        }
    }
}

/// An authenticated session whose role passed a `restrict_to` check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    user: AuthenticatedUser,
    granted: Role,
}

impl Authorized {
    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    /// Role that satisfied the check.
    pub fn granted(&self) -> Role {
        self.granted
    }

    pub fn into_user(self) -> AuthenticatedUser {
        self.user
    }
}
