// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and the authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;
use crate::storage::StoredUser;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user id)
    pub sub: String,

    /// Issued at, seconds since the epoch
    pub iat: i64,

    /// Issued at, milliseconds since the epoch. Used for the
    /// password-changed-after-issue check, which needs sub-second precision.
    pub iat_ms: i64,

    /// Expiration, seconds since the epoch
    pub exp: i64,
}

/// Authenticated user information.
///
/// This is the primary type used throughout the application to represent
/// the account making a request. It is built from the stored account after
/// the token has been verified, so it never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Account id (token `sub`)
    pub user_id: String,

    pub name: String,

    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,

    /// Role at the time the request was authenticated
    pub role: Role,
}

impl AuthenticatedUser {
    /// Check if the user has a specific role.
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    /// Check if the user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&StoredUser> for AuthenticatedUser {
    fn from(user: &StoredUser) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            photo: user.photo.clone(),
            role: user.role,
        }
    }
}
