// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthError, AuthService};
use crate::config::{AppConfig, QuerySettings};
use crate::mail::Mailer;
use crate::storage::{DocumentStore, MemoryStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AuthError> {
        let auth = AuthService::new(
            &config.auth,
            config.public_base_url.clone(),
            store.clone(),
            mailer,
        )?;
        Ok(Self {
            config: Arc::new(config),
            store,
            auth: Arc::new(auth),
        })
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory(config: AppConfig, mailer: Arc<dyn Mailer>) -> Result<Self, AuthError> {
        Self::new(config, Arc::new(MemoryStore::new()), mailer)
    }

    pub fn query_settings(&self) -> &QuerySettings {
        &self.config.query
    }

    /// Session cookies carry `Secure` in production or behind TLS.
    pub fn secure_cookies(&self) -> bool {
        self.config.environment.is_production() || self.config.tls.is_some()
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory state with a cheap bcrypt cost, plus the outbox receiving
    /// its mail.
    pub(crate) fn for_tests_with_outbox() -> (Self, Arc<crate::mail::OutboxMailer>) {
        let mut config = AppConfig::development();
        config.auth.bcrypt_cost = 4;
        config.public_base_url = url::Url::parse("https://notes.example.com")
            .expect("static url");
        let outbox = Arc::new(crate::mail::OutboxMailer::new());
        let state = Self::in_memory(config, outbox.clone()).expect("test state");
        (state, outbox)
    }

    pub(crate) fn for_tests() -> Self {
        Self::for_tests_with_outbox().0
    }
}
