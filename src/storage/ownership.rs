// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for single-record access.
//!
//! A record that belongs to someone else is reported as `NotFound`, never
//! as a permission failure, so callers cannot probe for other users' ids.

use crate::auth::AuthenticatedUser;

use super::{StorageError, StorageResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;

    /// Short label used in error messages.
    fn resource_name() -> &'static str;

    fn is_owned_by(&self, user: &AuthenticatedUser) -> bool {
        self.owner_user_id() == user.user_id
    }
}

/// Resolve an optional lookup into a resource the user owns.
pub trait OwnershipCheck<T> {
    /// Verify ownership and return the resource if authorized.
    fn verify_owner(self, user: &AuthenticatedUser) -> StorageResult<T>;
}

impl<T: OwnedResource> OwnershipCheck<T> for Option<T> {
    fn verify_owner(self, user: &AuthenticatedUser) -> StorageResult<T> {
        match self {
            Some(resource) if resource.is_owned_by(user) => Ok(resource),
            _ => Err(StorageError::NotFound(T::resource_name().to_string())),
        }
    }
}

impl<T: OwnedResource> OwnershipCheck<T> for StorageResult<Option<T>> {
    fn verify_owner(self, user: &AuthenticatedUser) -> StorageResult<T> {
        self?.verify_owner(user)
    }
}
