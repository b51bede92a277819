// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Notebook endpoints.
//!
//! A notebook that belongs to someone else answers exactly like one that
//! does not exist.

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::Value;

use crate::{
    auth::Auth,
    error::{ApiError, ErrorBody},
    models::{CreateNotebookRequest, UpdateNotebookRequest},
    query::{OwnershipPredicate, QueryParams, ScopedQuery, NOTEBOOKS, NOTES},
    state::AppState,
    storage::{NoteRepository, Notebook, NotebookRepository, OwnershipCheck},
};

use super::{public_document, ItemEnvelope, JsonBody, ListEnvelope};

/// List the caller's notebooks.
#[utoipa::path(
    get,
    path = "/api/v1/notebooks",
    tag = "Notebooks",
    security(("bearer" = [])),
    params(
        ("sort" = Option<String>, Query, description = "Comma-separated fields, `-` for descending"),
        ("fields" = Option<String>, Query, description = "Comma-separated projection"),
        ("page" = Option<usize>, Query, description = "1-based page number"),
        ("limit" = Option<usize>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Owned notebooks", body = [Notebook]),
        (status = 400, description = "Invalid query", body = ErrorBody)
    )
)]
pub async fn list_notebooks(
    Auth(user): Auth,
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListEnvelope<Value>>, ApiError> {
    let params = QueryParams::parse(query.as_deref().unwrap_or_default());
    let rows = ScopedQuery::build(
        &NOTEBOOKS,
        OwnershipPredicate::owner(&user),
        &params,
        state.query_settings(),
    )?
    .execute(NotebookRepository::new(state.store.as_ref()).documents()?);
    Ok(Json(ListEnvelope::new(rows)))
}

#[utoipa::path(
    post,
    path = "/api/v1/notebooks",
    tag = "Notebooks",
    security(("bearer" = [])),
    request_body = CreateNotebookRequest,
    responses(
        (status = 201, description = "Notebook created", body = Notebook),
        (status = 400, description = "Validation failed", body = ErrorBody)
    )
)]
pub async fn create_notebook(
    Auth(user): Auth,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateNotebookRequest>,
) -> Result<(StatusCode, Json<ItemEnvelope<Value>>), ApiError> {
    let notebook = Notebook::create(request, &user.user_id, Utc::now())?;
    NotebookRepository::new(state.store.as_ref()).create(&notebook)?;
    tracing::info!(user_id = %user.user_id, notebook_id = %notebook.id, "Notebook created");

    Ok((
        StatusCode::CREATED,
        Json(ItemEnvelope::new(public_document(&notebook, &NOTEBOOKS)?)),
    ))
}

/// One notebook with its notes embedded under `notes`.
#[utoipa::path(
    get,
    path = "/api/v1/notebooks/{id}",
    tag = "Notebooks",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Notebook ID")),
    responses(
        (status = 200, description = "Notebook and its notes", body = Notebook),
        (status = 404, description = "No such notebook", body = ErrorBody)
    )
)]
pub async fn get_notebook(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(notebook_id): Path<String>,
) -> Result<Json<ItemEnvelope<Value>>, ApiError> {
    let notebook = NotebookRepository::new(state.store.as_ref())
        .get(&notebook_id)
        .verify_owner(&user)?;

    let mut notes =
        NoteRepository::new(state.store.as_ref()).list_in_notebook(&user.user_id, &notebook.id)?;
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    let notes = notes
        .iter()
        .map(|note| public_document(note, &NOTES))
        .collect::<Result<Vec<_>, _>>()?;

    let mut document = public_document(&notebook, &NOTEBOOKS)?;
    if let Value::Object(fields) = &mut document {
        fields.insert("notes".to_string(), Value::Array(notes));
    }
    Ok(Json(ItemEnvelope::new(document)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/notebooks/{id}",
    tag = "Notebooks",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Notebook ID")),
    request_body = UpdateNotebookRequest,
    responses(
        (status = 200, description = "Notebook updated", body = Notebook),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 404, description = "No such notebook", body = ErrorBody)
    )
)]
pub async fn update_notebook(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(notebook_id): Path<String>,
    JsonBody(request): JsonBody<UpdateNotebookRequest>,
) -> Result<Json<ItemEnvelope<Value>>, ApiError> {
    let repo = NotebookRepository::new(state.store.as_ref());
    let mut preview = repo.get(&notebook_id).verify_owner(&user)?;
    preview.apply(&request)?;

    let updated = repo
        .update_with(&notebook_id, |notebook| {
            notebook.user == user.user_id && notebook.apply(&request).is_ok()
        })?
        .ok_or_else(ApiError::no_document)?;
    Ok(Json(ItemEnvelope::new(public_document(&updated, &NOTEBOOKS)?)))
}

/// Delete a notebook together with every note in it.
#[utoipa::path(
    delete,
    path = "/api/v1/notebooks/{id}",
    tag = "Notebooks",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Notebook ID")),
    responses(
        (status = 204, description = "Notebook and notes deleted"),
        (status = 404, description = "No such notebook", body = ErrorBody)
    )
)]
pub async fn delete_notebook(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(notebook_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let notebooks = NotebookRepository::new(state.store.as_ref());
    let notebook = notebooks.get(&notebook_id).verify_owner(&user)?;

    let removed_notes = NoteRepository::new(state.store.as_ref()).delete_in_notebook(&notebook.id)?;
    notebooks.delete(&notebook.id)?;
    tracing::info!(
        user_id = %user.user_id,
        notebook_id = %notebook.id,
        removed_notes,
        "Notebook deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}
