// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound email.
//!
//! Delivery sits behind the [`Mailer`] trait. The server ships with
//! [`LogMailer`], which writes messages to the log, and [`OutboxMailer`],
//! which keeps them in memory for tests and local tooling.
//!
//! A message only counts as delivered once its body reached someone. A
//! mailer that cannot hand the body over must return an error, so callers
//! never keep state (such as a pending reset secret) for mail nobody got.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Logs each message. Bodies (which may hold reset links) are only logged
/// when `echo_body` is set, which the server does in development. Without
/// the echo the log is not a delivery channel, so `send` fails.
#[derive(Debug, Clone, Default)]
pub struct LogMailer {
    echo_body: bool,
}

impl LogMailer {
    pub fn new(echo_body: bool) -> Self {
        Self { echo_body }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if !self.echo_body {
            tracing::warn!(to = %email.to, subject = %email.subject, "No mail transport configured; email dropped");
            return Err(MailError::Transport("no mail transport configured".into()));
        }
        tracing::info!(to = %email.to, subject = %email.subject, body = %email.body, "Email sent");
        Ok(())
    }
}

/// In-memory outbox. Can be switched into a failing mode to exercise
/// delivery errors.
#[derive(Debug, Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<Email>>,
    failing: AtomicBool,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages delivered so far.
    pub fn sent(&self) -> Vec<Email> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Email> {
        self.sent().pop()
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Transport("outbox is failing".into()));
        }
        self.sent
            .lock()
            .map_err(|_| MailError::Transport("outbox lock poisoned".into()))?
            .push(email.clone());
        Ok(())
    }
}

/// Password reset message pointing at `link`.
pub fn password_reset_email(to: &str, link: &str, ttl_minutes: i64) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("Your password reset token (valid for {ttl_minutes} min)"),
        body: format!(
            "Forgot your password? Submit a PATCH request with your new password and \
             passwordConfirm to: {link}\nIf you didn't forget your password, please ignore this email!"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn outbox_records_messages() {
        let outbox = OutboxMailer::new();
        let email = password_reset_email("a@example.com", "http://x/reset/abc", 10);
        outbox.send(&email).await.unwrap();

        assert_eq!(outbox.sent(), vec![email.clone()]);
        assert_eq!(outbox.last(), Some(email));
    }

    #[tokio::test]
    async fn failing_outbox_records_nothing() {
        let outbox = OutboxMailer::new();
        outbox.set_failing(true);
        let email = password_reset_email("a@example.com", "http://x/reset/abc", 10);
        assert!(outbox.send(&email).await.is_err());
        assert!(outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn log_mailer_delivers_only_when_echoing_bodies() {
        let email = password_reset_email("a@example.com", "http://x/reset/abc", 10);
        assert!(LogMailer::new(true).send(&email).await.is_ok());
        assert!(matches!(
            LogMailer::new(false).send(&email).await,
            Err(MailError::Transport(_))
        ));
    }

    #[test]
    fn reset_email_contains_link() {
        let email = password_reset_email("a@example.com", "http://x/reset/abc", 10);
        assert!(email.body.contains("http://x/reset/abc"));
        assert!(email.subject.contains("10 min"));
    }
}
