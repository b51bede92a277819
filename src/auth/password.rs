// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing.
//!
//! bcrypt with a configurable work factor. Hashing and verification are
//! CPU-bound, so the async variants run them on the blocking pool.

use std::sync::Arc;

use super::AuthError;

#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    /// Digest of a throwaway password. Verified against when an account is
    /// missing so unknown emails cost as much as wrong passwords.
    decoy: Arc<str>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        let decoy = bcrypt::hash(uuid::Uuid::new_v4().to_string(), cost)
            .map_err(|e| AuthError::Internal(format!("bcrypt setup failed: {e}")))?;
        Ok(Self {
            cost,
            decoy: Arc::from(decoy),
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// One-way digest with a fresh salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::hash(plaintext, self.cost)
            .map_err(|e| AuthError::Internal(format!("bcrypt hash failed: {e}")))
    }

    /// Compare a candidate against a stored digest. A malformed digest is a
    /// mismatch, never an error.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        bcrypt::verify(plaintext, digest).unwrap_or(false)
    }

    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, AuthError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Internal(format!("hash task failed: {e}")))?
    }

    /// Verify on the blocking pool. `None` verifies against the decoy
    /// digest and always fails.
    pub async fn verify_blocking(&self, plaintext: String, digest: Option<String>) -> bool {
        let hasher = self.clone();
        let result = tokio::task::spawn_blocking(move || match digest {
            Some(digest) => hasher.verify(&plaintext, &digest),
            None => {
                let _ = hasher.verify(&plaintext, &hasher.decoy);
                false
            }
        })
        .await;
        result.unwrap_or(false)
    }
}
