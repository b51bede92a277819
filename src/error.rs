// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP error type shared by every handler.
//!
//! Bodies look like `{"status":"fail","error":"...","error_code":"..."}`.
//! `status` is `fail` for 4xx and `error` for 5xx. Internal details are
//! attached to `detail` and only rendered while diagnostic mode is on
//! (development); production clients get the generic message.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::ValidationErrors;
use crate::query::QueryError;
use crate::storage::StorageError;

static DIAGNOSTICS: AtomicBool = AtomicBool::new(false);

/// Render internal error details in responses. Enabled in development.
pub fn set_diagnostic_mode(enabled: bool) {
    DIAGNOSTICS.store(enabled, Ordering::Relaxed);
}

fn diagnostics_enabled() -> bool {
    DIAGNOSTICS.load(Ordering::Relaxed)
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: &'static str,
    pub detail: Option<String>,
}

/// Wire shape of an error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// `fail` for client errors, `error` for server errors
    pub status: &'static str,
    pub error: String,
    pub error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: default_code(status),
            detail: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = code;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Missing or non-owned resource. Both cases read the same.
    pub fn no_document() -> Self {
        Self::not_found("No document found with that ID").with_code("not_found")
    }

    /// Server-side failure: the client gets a generic message, the detail is
    /// logged and only rendered in diagnostic mode.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Something went very wrong!")
            .with_detail(detail)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Body for this error; `expose_detail` controls whether `detail` is kept.
    pub fn body(&self, expose_detail: bool) -> ErrorBody {
        ErrorBody {
            status: if self.status.is_server_error() {
                "error"
            } else {
                "fail"
            },
            error: self.message.clone(),
            error_code: self.code,
            detail: if expose_detail {
                self.detail.clone()
            } else {
                None
            },
        }
    }
}

fn default_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::CONFLICT => "conflict",
        StatusCode::SERVICE_UNAVAILABLE => "service_unavailable",
        s if s.is_server_error() => "internal_error",
        _ => "error",
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.status, self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                detail = self.detail.as_deref().unwrap_or(""),
                "Request failed"
            );
        }
        let body = Json(self.body(diagnostics_enabled()));
        (self.status, body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) | StorageError::InvalidId(_) => ApiError::no_document(),
            StorageError::AlreadyExists(what) => ApiError::conflict("Duplicate field value")
                .with_code("duplicate_value")
                .with_detail(what),
            other => ApiError::internal(other.to_string()).with_code("storage_error"),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::bad_request(err.to_string()).with_code("validation_error")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let code = match &rejection {
            JsonRejection::MissingJsonContentType(_) => "unsupported_media_type",
            JsonRejection::JsonSyntaxError(_) => "invalid_json",
            _ => "invalid_body",
        };
        ApiError::new(rejection.status(), rejection.body_text()).with_code(code)
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::bad_request(err.to_string()).with_code("invalid_query")
    }
}
