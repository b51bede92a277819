// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Accounts live in `users/`; `user_emails/` is a unique index keyed by the
//! SHA-256 of the normalized email, claimed with a create-if-absent insert
//! before the account document is written.
//!
//! Deactivated accounts (`active: false`) stay on disk but are invisible to
//! every lookup except [`UserRepository::get`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::super::{Collection, DocumentStore, StorageError, StorageResult};
use super::{from_document, scan_typed, to_document, update_typed};
use crate::auth::{reset::digests_match, Role};
use crate::models::UserResponse;

/// Outstanding password-reset secret. Digest and expiry are always set and
/// cleared together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReset {
    /// Hex SHA-256 of the secret that was emailed
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingReset {
    pub fn accepts(&self, digest: &str, now: DateTime<Utc>) -> bool {
        self.expires_at > now && digests_match(&self.token_hash, digest)
    }
}

/// Account as stored. Use [`StoredUser::public`] for anything leaving the
/// server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub id: String,
    pub name: String,
    /// Normalized email
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset: Option<PendingReset>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl StoredUser {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            email: email.into(),
            photo: None,
            role: Role::User,
            password_hash: password_hash.into(),
            password_changed_at: None,
            password_reset: None,
            active: true,
            created_at: now,
        }
    }

    pub fn public(&self) -> UserResponse {
        UserResponse {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            photo: self.photo.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }

    /// Whether the password changed after a token issued at `issued_at_ms`.
    pub fn changed_password_after(&self, issued_at_ms: i64) -> bool {
        self.password_changed_at
            .is_some_and(|changed| changed.timestamp_millis() > issued_at_ms)
    }
}

/// Index key for a normalized email.
pub fn email_key(email: &str) -> String {
    hex::encode(Sha256::digest(email.as_bytes()))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmailIndexEntry {
    user_id: String,
}

/// Repository for user accounts.
pub struct UserRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> UserRepository<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    fn claim_email(&self, email: &str, user_id: &str) -> StorageResult<()> {
        let entry = to_document(&EmailIndexEntry {
            user_id: user_id.to_string(),
        })?;
        self.store
            .insert(Collection::UserEmails, &email_key(email), &entry)
            .map_err(|err| match err {
                StorageError::AlreadyExists(_) => StorageError::AlreadyExists(email.to_string()),
                other => other,
            })
    }

    fn release_email(&self, email: &str) -> StorageResult<()> {
        self.store
            .delete(Collection::UserEmails, &email_key(email))
            .map(|_| ())
    }

    /// Create a new account. Fails with `AlreadyExists(email)` if the email
    /// is taken, including by a deactivated account.
    pub fn create(&self, user: &StoredUser) -> StorageResult<()> {
        self.claim_email(&user.email, &user.id)?;
        if let Err(err) = self
            .store
            .insert(Collection::Users, &user.id, &to_document(user)?)
        {
            self.release_email(&user.email)?;
            return Err(err);
        }
        Ok(())
    }

    /// Fetch an account regardless of its active flag.
    pub fn get(&self, user_id: &str) -> StorageResult<Option<StoredUser>> {
        self.store
            .get(Collection::Users, user_id)?
            .map(from_document)
            .transpose()
    }

    pub fn get_active(&self, user_id: &str) -> StorageResult<Option<StoredUser>> {
        Ok(self.get(user_id)?.filter(|user| user.active))
    }

    /// Look up an active account by normalized email.
    pub fn find_active_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        let Some(entry) = self.store.get(Collection::UserEmails, &email_key(email))? else {
            return Ok(None);
        };
        let entry: EmailIndexEntry = from_document(entry)?;
        Ok(self
            .get_active(&entry.user_id)?
            .filter(|user| user.email == email))
    }

    /// Active account holding a live reset secret with this digest.
    pub fn find_by_reset_digest(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<StoredUser>> {
        let users: Vec<StoredUser> = scan_typed(self.store, Collection::Users)?;
        Ok(users.into_iter().find(|user| {
            user.active
                && user
                    .password_reset
                    .as_ref()
                    .is_some_and(|reset| reset.accepts(digest, now))
        }))
    }

    /// Atomic read-modify-write of one account. Returns the updated record,
    /// or `None` if the account is missing or `apply` declined.
    pub fn update_with<F>(&self, user_id: &str, apply: F) -> StorageResult<Option<StoredUser>>
    where
        F: FnMut(&mut StoredUser) -> bool,
    {
        update_typed(self.store, Collection::Users, user_id, apply)
    }

    /// Move an account to a new (normalized) email, keeping the index unique.
    pub fn change_email(&self, user_id: &str, email: &str) -> StorageResult<Option<StoredUser>> {
        let Some(current) = self.get_active(user_id)? else {
            return Ok(None);
        };
        if current.email == email {
            return Ok(Some(current));
        }

        self.claim_email(email, user_id)?;
        let updated = self.update_with(user_id, |user| {
            user.email = email.to_string();
            true
        })?;
        match updated {
            Some(user) => {
                self.release_email(&current.email)?;
                Ok(Some(user))
            }
            None => {
                self.release_email(email)?;
                Ok(None)
            }
        }
    }

    /// Soft-delete: the account disappears from every lookup.
    pub fn deactivate(&self, user_id: &str) -> StorageResult<bool> {
        Ok(self
            .update_with(user_id, |user| {
                user.active = false;
                true
            })?
            .is_some())
    }

    /// Hard delete, releasing the email.
    pub fn delete(&self, user_id: &str) -> StorageResult<bool> {
        let Some(user) = self.get(user_id)? else {
            return Ok(false);
        };
        let removed = self.store.delete(Collection::Users, user_id)?;
        self.release_email(&user.email)?;
        Ok(removed)
    }

    /// Public representation of every active account.
    pub fn list_active_public(&self) -> StorageResult<Vec<Value>> {
        let users: Vec<StoredUser> = scan_typed(self.store, Collection::Users)?;
        users
            .iter()
            .filter(|user| user.active)
            .map(|user| to_document(&user.public()))
            .collect()
    }
}
