// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password-reset secrets.
//!
//! A secret is 32 random bytes, hex-encoded, handed to the account holder
//! by email. Only its SHA-256 digest is persisted, next to an expiry.

use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

use super::AuthError;
use crate::storage::PendingReset;

/// Random bytes per secret.
pub const RESET_SECRET_BYTES: usize = 32;

/// The plaintext secret. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct ResetSecret(String);

impl ResetSecret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ResetSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ResetSecret(..)")
    }
}

/// Hex SHA-256 of a candidate secret.
pub fn digest_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Constant-time digest comparison.
pub fn digests_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Clone)]
pub struct ResetTokenManager {
    rng: SystemRandom,
    ttl: Duration,
}

impl std::fmt::Debug for ResetTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetTokenManager")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ResetTokenManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            rng: SystemRandom::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh secret plus the record to persist for it.
    pub fn generate(&self, now: DateTime<Utc>) -> Result<(ResetSecret, PendingReset), AuthError> {
        let mut bytes = [0u8; RESET_SECRET_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AuthError::Internal("system randomness unavailable".into()))?;

        let secret = hex::encode(bytes);
        let pending = PendingReset {
            token_hash: digest_secret(&secret),
            expires_at: now + self.ttl,
        };
        Ok((ResetSecret(secret), pending))
    }
}
