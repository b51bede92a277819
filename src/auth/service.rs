// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Auth Pipeline
//!
//! Account lifecycle operations built on the token codec, the password
//! hasher, the reset token manager and the user repository:
//!
//! - `signup` / `login` issue a session
//! - `protect` turns presented credentials into an [`Authenticated`] context
//! - `forgot_password` / `reset_password` run the recovery flow
//! - `update_password` rotates the password of a signed-in account
//!
//! Every session issued before a password change is rejected by `protect`,
//! because the change stamps `passwordChangedAt` after the token's issue time.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use url::Url;

use super::{
    claims::SessionClaims,
    context::{Anonymous, Authenticated},
    password::PasswordHasher,
    reset::{digest_secret, ResetSecret, ResetTokenManager},
    token::TokenCodec,
    AuthError, AuthenticatedUser,
};
use crate::config::AuthSettings;
use crate::mail::{password_reset_email, Mailer};
use crate::models::{
    check_new_password, normalize_email, ForgotPasswordRequest, LoginRequest,
    ResetPasswordRequest, SignupRequest, UpdatePasswordRequest, UserResponse, ValidationErrors,
};
use crate::storage::{DocumentStore, StoredUser, UserRepository};

/// Path of the reset endpoint, relative to the public base URL.
const RESET_PATH: &str = "api/v1/users/resetPassword";

/// A signed session and the account it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: SessionClaims,
    pub user: UserResponse,
}

pub struct AuthService {
    store: Arc<dyn DocumentStore>,
    tokens: TokenCodec,
    hasher: PasswordHasher,
    resets: ResetTokenManager,
    mailer: Arc<dyn Mailer>,
    public_base_url: Url,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("hasher", &self.hasher)
            .field("resets", &self.resets)
            .field("public_base_url", &self.public_base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(
        settings: &AuthSettings,
        public_base_url: Url,
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            store,
            tokens: TokenCodec::new(&settings.jwt_secret, settings.token_ttl),
            hasher: PasswordHasher::new(settings.bcrypt_cost)?,
            resets: ResetTokenManager::new(ChronoDuration::minutes(
                settings.reset_token_ttl_minutes,
            )),
            mailer,
            public_base_url,
        })
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self.store.as_ref())
    }

    /// Sign a fresh session for `user`.
    pub fn issue_session(&self, user: &StoredUser) -> Result<Session, AuthError> {
        let issued = self.tokens.issue(&user.id)?;
        Ok(Session {
            token: issued.token,
            claims: issued.claims,
            user: user.public(),
        })
    }

    /// Register a new account and sign it in.
    pub async fn signup(&self, request: SignupRequest) -> Result<Session, AuthError> {
        request.validate()?;
        let SignupRequest {
            name: Some(name),
            email: Some(email),
            password: Some(password),
            ..
        } = request
        else {
            return Err(AuthError::Internal("validated signup is missing fields".into()));
        };

        let password_hash = self.hasher.hash_blocking(password).await?;
        let user = StoredUser::new(
            name.trim(),
            normalize_email(&email),
            password_hash,
            Utc::now(),
        );
        self.users().create(&user)?;

        tracing::info!(target: "audit", user_id = %user.id, "Account created");
        self.issue_session(&user)
    }

    /// Exchange credentials for a session. An unknown email and a wrong
    /// password produce the same error after the same amount of hashing work.
    pub async fn login(&self, request: LoginRequest) -> Result<Session, AuthError> {
        let (Some(email), Some(password)) = (request.email, request.password) else {
            return Err(AuthError::MissingCredentials);
        };
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let user = self.users().find_active_by_email(&normalize_email(&email))?;
        let digest = user.as_ref().map(|u| u.password_hash.clone());
        let verified = self.hasher.verify_blocking(password, digest).await;

        match user {
            Some(user) if verified => {
                tracing::info!(target: "audit", user_id = %user.id, "Login succeeded");
                self.issue_session(&user)
            }
            _ => {
                tracing::info!(target: "audit", "Login failed");
                Err(AuthError::IncorrectCredentials)
            }
        }
    }

    /// Resolve presented credentials to an active account.
    pub fn protect(&self, anonymous: &Anonymous) -> Result<Authenticated, AuthError> {
        let token = anonymous.token().ok_or(AuthError::MissingToken)?;
        let claims = self.tokens.verify(token)?;

        let user = self
            .users()
            .get_active(&claims.sub)?
            .ok_or(AuthError::UserNoLongerExists)?;

        if user.changed_password_after(claims.iat_ms) {
            tracing::debug!(user_id = %user.id, "Session predates password change");
            return Err(AuthError::PasswordChanged);
        }

        Ok(Authenticated::new(AuthenticatedUser::from(&user), claims))
    }

    /// Email a single-use reset link to the account holder.
    ///
    /// The stored digest is cleared again if delivery fails or this future
    /// is dropped before the mailer reports success.
    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> Result<(), AuthError> {
        let email = request
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|email| !email.is_empty())
            .ok_or(AuthError::NoAccountForEmail)?;

        let users = self.users();
        let user = users
            .find_active_by_email(&email)?
            .ok_or(AuthError::NoAccountForEmail)?;

        let (secret, pending) = self.resets.generate(Utc::now())?;
        let token_hash = pending.token_hash.clone();
        users
            .update_with(&user.id, |stored| {
                stored.password_reset = Some(pending.clone());
                true
            })?
            .ok_or(AuthError::NoAccountForEmail)?;

        let mut rollback = ResetRollback::arm(users, &user.id, token_hash);

        let email = password_reset_email(
            &user.email,
            &self.reset_link(&secret),
            self.resets.ttl().num_minutes(),
        );
        match self.mailer.send(&email).await {
            Ok(()) => {
                rollback.disarm();
                tracing::info!(target: "audit", user_id = %user.id, "Password reset requested");
                Ok(())
            }
            Err(err) => {
                tracing::error!(user_id = %user.id, error = %err, "Reset email delivery failed");
                Err(AuthError::DeliveryFailed)
            }
        }
    }

    /// Link embedding the plaintext secret.
    pub fn reset_link(&self, secret: &ResetSecret) -> String {
        format!(
            "{}/{RESET_PATH}/{}",
            self.public_base_url.as_str().trim_end_matches('/'),
            secret.expose()
        )
    }

    /// Consume a reset secret and set a new password.
    pub async fn reset_password(
        &self,
        secret: &str,
        request: ResetPasswordRequest,
    ) -> Result<Session, AuthError> {
        let (Some(password), Some(confirm)) = (request.password, request.password_confirm) else {
            return Err(AuthError::PasswordFieldsRequired);
        };

        let digest = digest_secret(secret);
        let users = self.users();
        let candidate = users
            .find_by_reset_digest(&digest, Utc::now())?
            .ok_or(AuthError::ResetTokenInvalid)?;

        let mut errors = ValidationErrors::new();
        check_new_password(Some(&password), Some(&confirm), &mut errors);
        errors.into_result()?;

        let password_hash = self.hasher.hash_blocking(password).await?;

        // Hash and expiry are re-checked inside the write, so a concurrent
        // replay of the same secret finds the fields already cleared.
        let consumed_at = Utc::now();
        let user = users
            .update_with(&candidate.id, |stored| {
                let live = stored.active
                    && stored
                        .password_reset
                        .as_ref()
                        .is_some_and(|reset| reset.accepts(&digest, consumed_at));
                if live {
                    stored.password_hash = password_hash.clone();
                    stored.password_changed_at = Some(consumed_at);
                    stored.password_reset = None;
                }
                live
            })?
            .ok_or(AuthError::ResetTokenInvalid)?;

        tracing::info!(target: "audit", user_id = %user.id, "Password reset completed");
        self.issue_session(&user)
    }

    /// Change the password of a signed-in account after checking the
    /// current one.
    pub async fn update_password(
        &self,
        current: &AuthenticatedUser,
        request: UpdatePasswordRequest,
    ) -> Result<Session, AuthError> {
        let users = self.users();
        let stored = users
            .get_active(&current.user_id)?
            .ok_or(AuthError::UserNoLongerExists)?;

        let supplied = request.password_current.unwrap_or_default();
        if !self
            .hasher
            .verify_blocking(supplied, Some(stored.password_hash.clone()))
            .await
        {
            tracing::info!(target: "audit", user_id = %stored.id, "Password update rejected");
            return Err(AuthError::IncorrectCurrentPassword);
        }

        let mut errors = ValidationErrors::new();
        check_new_password(
            request.password.as_deref(),
            request.password_confirm.as_deref(),
            &mut errors,
        );
        errors.into_result()?;
        let Some(password) = request.password else {
            return Err(AuthError::PasswordFieldsRequired);
        };

        let password_hash = self.hasher.hash_blocking(password).await?;
        let changed_at = Utc::now();
        let user = users
            .update_with(&stored.id, |user| {
                user.password_hash = password_hash.clone();
                user.password_changed_at = Some(changed_at);
                user.active
            })?
            .ok_or(AuthError::UserNoLongerExists)?;

        tracing::info!(target: "audit", user_id = %user.id, "Password updated");
        self.issue_session(&user)
    }
}

/// Clears a just-written reset digest unless disarmed. Runs on every exit
/// path of `forgot_password`, including cancellation.
struct ResetRollback<'a> {
    users: UserRepository<'a>,
    user_id: String,
    token_hash: String,
    armed: bool,
}

impl<'a> ResetRollback<'a> {
    fn arm(users: UserRepository<'a>, user_id: &str, token_hash: String) -> Self {
        Self {
            users,
            user_id: user_id.to_string(),
            token_hash,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ResetRollback<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Only clear our own digest; a newer request may have replaced it.
        let result = self.users.update_with(&self.user_id, |user| {
            let ours = user
                .password_reset
                .as_ref()
                .is_some_and(|reset| reset.token_hash == self.token_hash);
            if ours {
                user.password_reset = None;
            }
            ours
        });
        if let Err(err) = result {
            tracing::error!(user_id = %self.user_id, error = %err, "Failed to roll back reset token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::{Email, LogMailer, MailError, OutboxMailer};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::time::Duration;

    const PASSWORD: &str = "secret123";

    struct Harness {
        service: AuthService,
        store: Arc<MemoryStore>,
        outbox: Arc<OutboxMailer>,
    }

    fn settings() -> AuthSettings {
        AuthSettings {
            jwt_secret: "test-secret-test-secret-test-secret".into(),
            token_ttl: Duration::from_secs(3600),
            cookie_ttl_days: 90,
            bcrypt_cost: 4,
            reset_token_ttl_minutes: 10,
        }
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(OutboxMailer::new());
        let service = AuthService::new(
            &settings(),
            Url::parse("https://notes.example.com").unwrap(),
            store.clone(),
            outbox.clone(),
        )
        .unwrap();
        Harness {
            service,
            store,
            outbox,
        }
    }

    fn signup_request(email: &str) -> SignupRequest {
        SignupRequest {
            name: Some("Alice".into()),
            email: Some(email.into()),
            password: Some(PASSWORD.into()),
            password_confirm: Some(PASSWORD.into()),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    fn bearer(token: &str) -> Anonymous {
        Anonymous::new(Some(token.to_string()))
    }

    fn stored(h: &Harness, id: &str) -> StoredUser {
        UserRepository::new(h.store.as_ref())
            .get(id)
            .unwrap()
            .unwrap()
    }

    /// Secret from the last reset email.
    fn delivered_secret(outbox: &OutboxMailer) -> String {
        let body = outbox.last().unwrap().body;
        let start = body.find("resetPassword/").unwrap() + "resetPassword/".len();
        body[start..]
            .split_whitespace()
            .next()
            .unwrap()
            .to_string()
    }

    fn reset_request(password: &str) -> ResetPasswordRequest {
        ResetPasswordRequest {
            password: Some(password.into()),
            password_confirm: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn signup_hashes_password_and_signs_in() {
        let h = harness();
        let session = h.service.signup(signup_request("A@X.com")).await.unwrap();

        assert_eq!(session.user.email, "a@x.com");
        let user = stored(&h, &session.user.id);
        assert_ne!(user.password_hash, PASSWORD);
        assert!(!serde_json::to_string(&session.user).unwrap().contains("password"));
        assert_eq!(
            h.service.protect(&bearer(&session.token)).unwrap().user().user_id,
            user.id
        );
    }

    #[tokio::test]
    async fn signup_rejects_duplicates_and_mismatched_confirmation() {
        let h = harness();
        h.service.signup(signup_request("a@x.com")).await.unwrap();

        let err = h.service.signup(signup_request(" A@x.com ")).await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken(ref email) if email == "a@x.com"));

        let mut request = signup_request("b@x.com");
        request.password_confirm = Some("different1".into());
        let err = h.service.signup(request).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
        assert!(err.to_string().contains("Confirm Password should match password"));
    }

    #[tokio::test]
    async fn login_errors_do_not_reveal_which_part_was_wrong() {
        let h = harness();
        h.service.signup(signup_request("a@x.com")).await.unwrap();

        let wrong_password = h
            .service
            .login(login_request("a@x.com", "wrong-password"))
            .await
            .unwrap_err();
        let unknown_email = h
            .service
            .login(login_request("nobody@x.com", PASSWORD))
            .await
            .unwrap_err();

        assert_eq!(wrong_password, AuthError::IncorrectCredentials);
        assert_eq!(wrong_password, unknown_email);
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn login_requires_both_fields_and_normalizes_email() {
        let h = harness();
        h.service.signup(signup_request("a@x.com")).await.unwrap();

        let missing = LoginRequest {
            email: Some("a@x.com".into()),
            password: None,
        };
        assert_eq!(
            h.service.login(missing).await.unwrap_err(),
            AuthError::MissingCredentials
        );
        assert!(h
            .service
            .login(login_request(" A@X.COM", PASSWORD))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn protect_rejects_missing_and_invalid_tokens() {
        let h = harness();
        assert_eq!(
            h.service.protect(&Anonymous::default()).unwrap_err(),
            AuthError::MissingToken
        );
        assert_eq!(
            h.service.protect(&bearer("garbage")).unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn protect_rejects_deactivated_accounts() {
        let h = harness();
        let session = h.service.signup(signup_request("a@x.com")).await.unwrap();
        UserRepository::new(h.store.as_ref())
            .deactivate(&session.user.id)
            .unwrap();

        assert_eq!(
            h.service.protect(&bearer(&session.token)).unwrap_err(),
            AuthError::UserNoLongerExists
        );
        assert_eq!(
            h.service
                .login(login_request("a@x.com", PASSWORD))
                .await
                .unwrap_err(),
            AuthError::IncorrectCredentials
        );
    }

    #[tokio::test]
    async fn password_update_invalidates_older_sessions() {
        let h = harness();
        let session = h.service.signup(signup_request("a@x.com")).await.unwrap();
        let old = h
            .service
            .tokens()
            .issue_at(&session.user.id, Utc::now() - ChronoDuration::seconds(5))
            .unwrap();
        let current = h.service.protect(&bearer(&old.token)).unwrap().into_user();

        let fresh = h
            .service
            .update_password(
                &current,
                UpdatePasswordRequest {
                    password_current: Some(PASSWORD.into()),
                    password: Some("newpass123".into()),
                    password_confirm: Some("newpass123".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            h.service.protect(&bearer(&old.token)).unwrap_err(),
            AuthError::PasswordChanged
        );
        assert!(h.service.protect(&bearer(&fresh.token)).is_ok());
        assert!(h
            .service
            .login(login_request("a@x.com", "newpass123"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn update_password_checks_current_password() {
        let h = harness();
        let session = h.service.signup(signup_request("a@x.com")).await.unwrap();
        let user = h.service.protect(&bearer(&session.token)).unwrap().into_user();

        let err = h
            .service
            .update_password(
                &user,
                UpdatePasswordRequest {
                    password_current: Some("not-it-at-all".into()),
                    password: Some("newpass123".into()),
                    password_confirm: Some("newpass123".into()),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::IncorrectCurrentPassword);

        let err = h
            .service
            .update_password(
                &user,
                UpdatePasswordRequest {
                    password_current: Some(PASSWORD.into()),
                    password: Some("short".into()),
                    password_confirm: Some("short".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
    }

    #[tokio::test]
    async fn reset_secret_works_exactly_once() {
        let h = harness();
        let session = h.service.signup(signup_request("a@x.com")).await.unwrap();
        h.service
            .forgot_password(ForgotPasswordRequest {
                email: Some("a@x.com".into()),
            })
            .await
            .unwrap();

        let email = h.outbox.last().unwrap();
        assert_eq!(email.to, "a@x.com");
        assert!(email
            .body
            .contains("https://notes.example.com/api/v1/users/resetPassword/"));

        let secret = delivered_secret(&h.outbox);
        let pending = stored(&h, &session.user.id).password_reset.unwrap();
        assert_ne!(pending.token_hash, secret);
        assert!(pending.expires_at > Utc::now());

        let fresh = h
            .service
            .reset_password(&secret, reset_request("newpass123"))
            .await
            .unwrap();
        assert_eq!(fresh.user.id, session.user.id);
        assert!(stored(&h, &session.user.id).password_reset.is_none());

        let replay = h
            .service
            .reset_password(&secret, reset_request("another123"))
            .await
            .unwrap_err();
        assert_eq!(replay, AuthError::ResetTokenInvalid);

        assert_eq!(
            h.service
                .login(login_request("a@x.com", PASSWORD))
                .await
                .unwrap_err(),
            AuthError::IncorrectCredentials
        );
        assert_eq!(
            h.service.protect(&bearer(&session.token)).unwrap_err(),
            AuthError::PasswordChanged
        );
    }

    #[tokio::test]
    async fn expired_reset_secret_is_rejected() {
        let h = harness();
        let session = h.service.signup(signup_request("a@x.com")).await.unwrap();
        h.service
            .forgot_password(ForgotPasswordRequest {
                email: Some("a@x.com".into()),
            })
            .await
            .unwrap();
        let secret = delivered_secret(&h.outbox);

        UserRepository::new(h.store.as_ref())
            .update_with(&session.user.id, |user| {
                if let Some(reset) = user.password_reset.as_mut() {
                    reset.expires_at = Utc::now() - ChronoDuration::seconds(1);
                }
                true
            })
            .unwrap();

        assert_eq!(
            h.service
                .reset_password(&secret, reset_request("newpass123"))
                .await
                .unwrap_err(),
            AuthError::ResetTokenInvalid
        );
    }

    #[tokio::test]
    async fn reset_requires_both_password_fields() {
        let h = harness();
        let err = h
            .service
            .reset_password(
                "whatever",
                ResetPasswordRequest {
                    password: Some("newpass123".into()),
                    password_confirm: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::PasswordFieldsRequired);
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email_is_not_found() {
        let h = harness();
        let err = h
            .service
            .forgot_password(ForgotPasswordRequest {
                email: Some("nobody@x.com".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NoAccountForEmail);
        assert!(h.outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_delivery_clears_the_reset_fields() {
        let h = harness();
        let session = h.service.signup(signup_request("a@x.com")).await.unwrap();
        h.outbox.set_failing(true);

        let err = h
            .service
            .forgot_password(ForgotPasswordRequest {
                email: Some("a@x.com".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::DeliveryFailed);
        assert!(stored(&h, &session.user.id).password_reset.is_none());
    }

    #[tokio::test]
    async fn unknown_secret_is_reported_before_password_rules() {
        let h = harness();
        let err = h
            .service
            .reset_password(&"0".repeat(64), reset_request("short"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::ResetTokenInvalid);
    }

    #[tokio::test]
    async fn reset_with_live_secret_still_enforces_password_rules() {
        let h = harness();
        let session = h.service.signup(signup_request("a@x.com")).await.unwrap();
        h.service
            .forgot_password(ForgotPasswordRequest {
                email: Some("a@x.com".into()),
            })
            .await
            .unwrap();
        let secret = delivered_secret(&h.outbox);

        let err = h
            .service
            .reset_password(&secret, reset_request("short"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
        assert!(stored(&h, &session.user.id).password_reset.is_some());
    }

    #[tokio::test]
    async fn log_mailer_without_transport_leaves_no_live_secret() {
        let store = Arc::new(MemoryStore::new());
        let service = AuthService::new(
            &settings(),
            Url::parse("https://notes.example.com").unwrap(),
            store.clone(),
            Arc::new(LogMailer::new(false)),
        )
        .unwrap();
        let session = service.signup(signup_request("a@x.com")).await.unwrap();

        let err = service
            .forgot_password(ForgotPasswordRequest {
                email: Some("a@x.com".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::DeliveryFailed);

        let user = UserRepository::new(store.as_ref())
            .get(&session.user.id)
            .unwrap()
            .unwrap();
        assert!(user.password_reset.is_none());
    }

    struct StalledMailer;

    #[async_trait]
    impl Mailer for StalledMailer {
        async fn send(&self, _email: &Email) -> Result<(), MailError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancelled_request_clears_the_reset_fields() {
        let store = Arc::new(MemoryStore::new());
        let service = AuthService::new(
            &settings(),
            Url::parse("http://localhost:3001").unwrap(),
            store.clone(),
            Arc::new(StalledMailer),
        )
        .unwrap();
        let session = service.signup(signup_request("a@x.com")).await.unwrap();

        let attempt = tokio::time::timeout(
            Duration::from_millis(50),
            service.forgot_password(ForgotPasswordRequest {
                email: Some("a@x.com".into()),
            }),
        )
        .await;
        assert!(attempt.is_err());

        let user = UserRepository::new(store.as_ref())
            .get(&session.user.id)
            .unwrap()
            .unwrap();
        assert!(user.password_reset.is_none());
    }
}
