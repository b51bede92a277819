// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! The `Display` text of each variant is exactly what the client sees, so
//! variants that must be indistinguishable to a caller (unknown email vs.
//! wrong password at login) share one variant.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::models::ValidationErrors;
use crate::storage::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No session token in the Authorization header or cookie
    MissingToken,
    /// Token is malformed, has a bad signature, or has expired
    InvalidToken,
    /// Token subject no longer maps to an active account
    UserNoLongerExists,
    /// Password changed after the token was issued
    PasswordChanged,
    /// Login request without email or password
    MissingCredentials,
    /// Unknown email or wrong password
    IncorrectCredentials,
    /// Wrong current password on password update
    IncorrectCurrentPassword,
    /// Role not in the allowed set
    InsufficientPermissions,
    /// Reset request without both password fields
    PasswordFieldsRequired,
    /// Reset secret unknown, already used, or expired
    ResetTokenInvalid,
    /// Forgot-password for an email with no active account
    NoAccountForEmail,
    /// Reset email could not be delivered
    DeliveryFailed,
    /// Request body failed field validation
    Invalid(ValidationErrors),
    /// Signup or email change hit an address that is already registered
    EmailTaken(String),
    /// Internal error
    Internal(String),
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidToken => "invalid_token",
            AuthError::UserNoLongerExists => "user_no_longer_exists",
            AuthError::PasswordChanged => "password_changed",
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::IncorrectCredentials => "incorrect_credentials",
            AuthError::IncorrectCurrentPassword => "incorrect_current_password",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::PasswordFieldsRequired => "password_fields_required",
            AuthError::ResetTokenInvalid => "reset_token_invalid",
            AuthError::NoAccountForEmail => "no_account_for_email",
            AuthError::DeliveryFailed => "email_delivery_failed",
            AuthError::Invalid(_) => "validation_error",
            AuthError::EmailTaken(_) => "duplicate_value",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::UserNoLongerExists
            | AuthError::PasswordChanged
            | AuthError::IncorrectCredentials
            | AuthError::IncorrectCurrentPassword => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::MissingCredentials
            | AuthError::PasswordFieldsRequired
            | AuthError::ResetTokenInvalid
            | AuthError::Invalid(_) => StatusCode::BAD_REQUEST,
            AuthError::EmailTaken(_) => StatusCode::CONFLICT,
            AuthError::NoAccountForEmail => StatusCode::NOT_FOUND,
            AuthError::DeliveryFailed | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => {
                write!(f, "You are not logged in! Please log in to get access.")
            }
            AuthError::InvalidToken => write!(f, "Invalid or expired token. Please log in again!"),
            AuthError::UserNoLongerExists => {
                write!(f, "The user belonging to this token does no longer exist")
            }
            AuthError::PasswordChanged => {
                write!(f, "User has recently changed their password, please login again!")
            }
            AuthError::MissingCredentials => write!(f, "Please provide email and password!"),
            AuthError::IncorrectCredentials => write!(f, "Incorrect email or password"),
            AuthError::IncorrectCurrentPassword => write!(f, "Your current password is wrong"),
            AuthError::InsufficientPermissions => {
                write!(f, "You do not have permission to perform this action")
            }
            AuthError::PasswordFieldsRequired => {
                write!(f, "Password and passwordConfirm fields are required")
            }
            AuthError::ResetTokenInvalid => write!(f, "Token is invalid or has expired"),
            AuthError::NoAccountForEmail => write!(f, "There is no user with this email address"),
            AuthError::DeliveryFailed => write!(
                f,
                "There was an error sending the email. Please try again later!"
            ),
            AuthError::Invalid(errors) => write!(f, "{errors}"),
            AuthError::EmailTaken(email) => {
                write!(f, "Duplicate field value: {email}. Please use another value!")
            }
            AuthError::Internal(_) => write!(f, "Something went very wrong!"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        AuthError::Invalid(errors)
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists(email) => AuthError::EmailTaken(email),
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = err.status_code();
        let code = err.error_code();
        let message = err.to_string();
        let api = ApiError::new(status, message).with_code(code);
        match err {
            AuthError::Internal(detail) => api.with_detail(detail),
            _ => api,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
