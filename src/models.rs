// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request and response bodies, plus the field rules they are checked
//! against.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

use crate::auth::Role;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_NOTEBOOK_TITLE_LEN: usize = 35;
pub const MAX_NOTE_TITLE_LEN: usize = 100;
pub const MAX_NOTE_DESCRIPTION_LEN: usize = 200;
pub const MAX_NOTE_CONTENT_LEN: usize = 70_000;
pub const DEFAULT_NOTE_TITLE: &str = "Untitled";
pub const DEFAULT_NOTEBOOK_COLOR: &str = "#FFA500";

// ========== Validation ==========

/// Field-level validation failures, reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid input data. {}", self.0.join(". "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Canonical form of an email address: trimmed, NFKC-normalized, lowercase.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().nfkc().collect::<String>().to_lowercase()
}

/// Structural email check: one `@`, a non-empty local part and a dotted
/// domain with non-empty labels.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

pub(crate) fn check_name(name: Option<&str>, errors: &mut ValidationErrors) {
    if blank(name) {
        errors.push("Please tell us your name!");
    }
}

pub(crate) fn check_email(email: Option<&str>, errors: &mut ValidationErrors) {
    match email {
        None => errors.push("Please provide an email address!"),
        Some(raw) if raw.trim().is_empty() => errors.push("Please provide an email address!"),
        Some(raw) if !is_valid_email(&normalize_email(raw)) => {
            errors.push("Please enter a valid email!")
        }
        Some(_) => {}
    }
}

/// Password policy shared by signup, reset and update.
pub(crate) fn check_new_password(
    password: Option<&str>,
    confirm: Option<&str>,
    errors: &mut ValidationErrors,
) {
    match password {
        None | Some("") => errors.push("Please provide a password"),
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => errors.push(format!(
            "Password must be more or equal to {MIN_PASSWORD_LEN} characters"
        )),
        Some(_) => {}
    }
    match confirm {
        None | Some("") => errors.push("Please confirm password"),
        Some(c) if Some(c) != password => errors.push("Confirm Password should match password"),
        Some(_) => {}
    }
}

pub(crate) fn check_max_len(
    value: Option<&str>,
    max: usize,
    message: &str,
    errors: &mut ValidationErrors,
) {
    if value.is_some_and(|v| v.chars().count() > max) {
        errors.push(message);
    }
}

// ========== Users ==========

/// Public view of an account. Never carries credentials or reset state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(self.name.as_deref(), &mut errors);
        check_email(self.email.as_deref(), &mut errors);
        check_new_password(
            self.password.as_deref(),
            self.password_confirm.as_deref(),
            &mut errors,
        );
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePasswordRequest {
    pub password_current: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

/// Self-service profile update. Password fields are accepted only so the
/// request can be rejected with a pointer to the right endpoint.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

impl UpdateMeRequest {
    pub fn touches_password(&self) -> bool {
        self.password.is_some() || self.password_confirm.is_some()
    }
}

/// Admin edit of another account. Passwords are not editable here.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub role: Option<Role>,
}

/// Profile fields shared by the self-service and admin edits.
pub(crate) fn check_profile_update(
    name: Option<&str>,
    email: Option<&str>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if name.is_some() {
        check_name(name, &mut errors);
    }
    if email.is_some() {
        check_email(email, &mut errors);
    }
    errors.into_result()
}

/// Session issued by signup, login, reset and password update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionResponse {
    /// Always `success`
    pub status: &'static str,
    pub token: String,
    pub data: UserData,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserData {
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: String,
}

// ========== Notebooks ==========

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateNotebookRequest {
    pub title: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateNotebookRequest {
    pub title: Option<String>,
    pub color: Option<String>,
}

pub(crate) fn check_notebook_title(title: Option<&str>, errors: &mut ValidationErrors) {
    if blank(title) {
        errors.push("Please provide a notebook title");
    }
    check_max_len(
        title,
        MAX_NOTEBOOK_TITLE_LEN,
        "A notebook title must have less or equal than 35 characters",
        errors,
    );
}

// ========== Notes ==========

/// GeoJSON point attached to a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    #[serde(rename = "type", default = "point_type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

fn point_type() -> String {
    "Point".to_string()
}

impl Location {
    pub(crate) fn check(&self, errors: &mut ValidationErrors) {
        if self.kind != "Point" {
            errors.push("Location type must be Point");
        }
        if !self.coordinates.is_empty() && self.coordinates.len() != 2 {
            errors.push("Location coordinates must be [longitude, latitude]");
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub location: Option<Location>,
    pub favorite: Option<bool>,
    /// Target notebook; taken from the path on nested routes
    pub notebook: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub location: Option<Location>,
    pub favorite: Option<bool>,
    pub notebook: Option<String>,
}

/// Shared checks for note bodies; `title` is `None` when left unchanged.
pub(crate) fn check_note_fields(
    title: Option<&str>,
    description: Option<&str>,
    content: Option<&str>,
    location: Option<&Location>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if title.is_some_and(|t| t.trim().is_empty()) {
        errors.push("A note must contain at least a title");
    }
    check_max_len(
        title,
        MAX_NOTE_TITLE_LEN,
        "A note title must have less or equal than 100 characters",
        &mut errors,
    );
    check_max_len(
        description,
        MAX_NOTE_DESCRIPTION_LEN,
        "A note description cannot exceed 200 characters",
        &mut errors,
    );
    check_max_len(
        content,
        MAX_NOTE_CONTENT_LEN,
        "A note cannot exceed 70000 characters",
        &mut errors,
    );
    if let Some(location) = location {
        location.check(&mut errors);
    }
    errors.into_result()
}
