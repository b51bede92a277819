// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session-token authentication for the Mindful API.
//!
//! ## Auth Flow
//!
//! 1. `signup` or `login` returns an HS256 session token in the body and in
//!    the `jwt` cookie
//! 2. Clients send `Authorization: Bearer <token>` or the cookie back
//! 3. The server:
//!    - verifies signature and expiry
//!    - loads the account named by `sub` (must still be active)
//!    - rejects tokens issued before the last password change
//!
//! ## Security
//!
//! - Passwords are stored as bcrypt digests
//! - Reset secrets are stored as SHA-256 digests with a short expiry and
//!   are consumed by a single conditional write
//! - Login failures read the same for unknown emails and wrong passwords

pub mod claims;
pub mod context;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod reset;
pub mod roles;
pub mod service;
pub mod token;

pub use claims::{AuthenticatedUser, SessionClaims};
pub use context::{Anonymous, Authenticated, Authorized};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use roles::Role;
pub use service::{AuthService, Session};
