// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Note endpoints, including the favorites alias, full-text search and
//! per-notebook analytics.

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    auth::{Auth, AuthenticatedUser},
    error::{ApiError, ErrorBody},
    models::{CreateNoteRequest, UpdateNoteRequest, ValidationErrors},
    query::{
        order::DEFAULT_SORT, CompareOp, NoteStats, OwnershipPredicate, QueryParams, ScopedQuery,
        NOTES,
    },
    state::AppState,
    storage::{
        Note, NoteRepository, Notebook, NotebookRepository, OwnershipCheck, StorageError,
    },
};

use super::{public_document, ItemEnvelope, JsonBody, ListEnvelope};

/// `{"status":"success","data":{"totalNumNotes":n,"stats":[...]}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyticsResponse {
    pub status: &'static str,
    pub data: NoteStats,
}

/// Resolve a notebook named in a request body. Unknown and foreign
/// notebooks are rejected the same way.
fn referenced_notebook(
    state: &AppState,
    user: &AuthenticatedUser,
    notebook_id: &str,
) -> Result<Notebook, ApiError> {
    match NotebookRepository::new(state.store.as_ref())
        .get(notebook_id)
        .verify_owner(user)
    {
        Ok(notebook) => Ok(notebook),
        Err(StorageError::NotFound(_)) | Err(StorageError::InvalidId(_)) => Err(
            ValidationErrors::single(format!("Invalid notebook: {notebook_id}.")).into(),
        ),
        Err(other) => Err(other.into()),
    }
}

fn insert_note(
    state: &AppState,
    user: &AuthenticatedUser,
    notebook: &Notebook,
    request: CreateNoteRequest,
) -> Result<(StatusCode, Json<ItemEnvelope<Value>>), ApiError> {
    let note = Note::create(request, &user.user_id, &notebook.id, Utc::now())?;
    NoteRepository::new(state.store.as_ref()).create(&note)?;
    tracing::info!(
        user_id = %user.user_id,
        notebook_id = %notebook.id,
        note_id = %note.id,
        "Note created"
    );
    Ok((
        StatusCode::CREATED,
        Json(ItemEnvelope::new(public_document(&note, &NOTES)?)),
    ))
}

fn run_query(
    state: &AppState,
    query: ScopedQuery,
) -> Result<Json<ListEnvelope<Value>>, ApiError> {
    let rows = query.execute(NoteRepository::new(state.store.as_ref()).documents()?);
    Ok(Json(ListEnvelope::new(rows)))
}

fn parse_params(query: Option<String>) -> QueryParams {
    QueryParams::parse(query.as_deref().unwrap_or_default())
}

/// List the caller's notes.
#[utoipa::path(
    get,
    path = "/api/v1/notes",
    tag = "Notes",
    security(("bearer" = [])),
    params(
        ("sort" = Option<String>, Query, description = "Comma-separated fields, `-` for descending"),
        ("fields" = Option<String>, Query, description = "Comma-separated projection"),
        ("page" = Option<usize>, Query, description = "1-based page number"),
        ("limit" = Option<usize>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Owned notes", body = [Note]),
        (status = 400, description = "Invalid query", body = ErrorBody)
    )
)]
pub async fn list_notes(
    Auth(user): Auth,
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListEnvelope<Value>>, ApiError> {
    let params = parse_params(query);
    let query = ScopedQuery::build(
        &NOTES,
        OwnershipPredicate::owner(&user),
        &params,
        state.query_settings(),
    )?;
    run_query(&state, query)
}

/// Create a note in the notebook named by `notebook`.
#[utoipa::path(
    post,
    path = "/api/v1/notes",
    tag = "Notes",
    security(("bearer" = [])),
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = Note),
        (status = 400, description = "Validation failed or notebook not found", body = ErrorBody)
    )
)]
pub async fn create_note(
    Auth(user): Auth,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateNoteRequest>,
) -> Result<(StatusCode, Json<ItemEnvelope<Value>>), ApiError> {
    let Some(notebook_id) = request.notebook.clone() else {
        return Err(ValidationErrors::single("Note must belong to a notebook").into());
    };
    let notebook = referenced_notebook(&state, &user, &notebook_id)?;
    insert_note(&state, &user, &notebook, request)
}

/// Notes of one notebook.
#[utoipa::path(
    get,
    path = "/api/v1/notebooks/{id}/notes",
    tag = "Notes",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Notebook ID")),
    responses(
        (status = 200, description = "Owned notes in the notebook", body = [Note]),
        (status = 400, description = "Invalid query", body = ErrorBody)
    )
)]
pub async fn list_notebook_notes(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(notebook_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListEnvelope<Value>>, ApiError> {
    let params = parse_params(query);
    let query = ScopedQuery::build(
        &NOTES,
        OwnershipPredicate::owner_within(&user, "notebook", &notebook_id),
        &params,
        state.query_settings(),
    )?;
    run_query(&state, query)
}

/// Create a note in the notebook from the path. A `notebook` in the body
/// is ignored.
#[utoipa::path(
    post,
    path = "/api/v1/notebooks/{id}/notes",
    tag = "Notes",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Notebook ID")),
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = Note),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 404, description = "No such notebook", body = ErrorBody)
    )
)]
pub async fn create_notebook_note(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(notebook_id): Path<String>,
    JsonBody(request): JsonBody<CreateNoteRequest>,
) -> Result<(StatusCode, Json<ItemEnvelope<Value>>), ApiError> {
    let notebook = NotebookRepository::new(state.store.as_ref())
        .get(&notebook_id)
        .verify_owner(&user)?;
    insert_note(&state, &user, &notebook, request)
}

/// Favorite notes, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/notes/favorites",
    tag = "Notes",
    security(("bearer" = [])),
    responses((status = 200, description = "Owned favorite notes", body = [Note]))
)]
pub async fn favorite_notes(
    Auth(user): Auth,
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListEnvelope<Value>>, ApiError> {
    let mut params = parse_params(query);
    params.set_condition("favorite", CompareOp::Eq, "true");
    params.sort = Some(DEFAULT_SORT.to_string());

    let query = ScopedQuery::build(
        &NOTES,
        OwnershipPredicate::owner(&user),
        &params,
        state.query_settings(),
    )?
    .require_flag("favorite", true);
    run_query(&state, query)
}

/// Whole-word search over note content. A blank term lists every note.
#[utoipa::path(
    get,
    path = "/api/v1/notes/search-notes",
    tag = "Notes",
    security(("bearer" = [])),
    params(("search" = Option<String>, Query, description = "Words to look for")),
    responses((status = 200, description = "Matching owned notes", body = [Note]))
)]
pub async fn search_notes(
    Auth(user): Auth,
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ListEnvelope<Value>>, ApiError> {
    let params = parse_params(query);
    let query = ScopedQuery::build(
        &NOTES,
        OwnershipPredicate::owner(&user),
        &params,
        state.query_settings(),
    )?
    .with_text_search(params.search.as_deref());
    run_query(&state, query)
}

/// Note counts per notebook.
#[utoipa::path(
    get,
    path = "/api/v1/notes/analytics",
    tag = "Notes",
    security(("bearer" = [])),
    responses((status = 200, description = "Counts for the caller's notes", body = AnalyticsResponse))
)]
pub async fn note_analytics(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let notes = NoteRepository::new(state.store.as_ref()).list_all()?;
    let notebooks = NotebookRepository::new(state.store.as_ref()).list_all()?;
    Ok(Json(AnalyticsResponse {
        status: "success",
        data: NoteStats::compute(&user, &notes, &notebooks),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/notes/{id}",
    tag = "Notes",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note", body = Note),
        (status = 404, description = "No such note", body = ErrorBody)
    )
)]
pub async fn get_note(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> Result<Json<ItemEnvelope<Value>>, ApiError> {
    let note = NoteRepository::new(state.store.as_ref())
        .get(&note_id)
        .verify_owner(&user)?;
    Ok(Json(ItemEnvelope::new(public_document(&note, &NOTES)?)))
}

/// Partial update. Moving the note requires owning the target notebook.
#[utoipa::path(
    patch,
    path = "/api/v1/notes/{id}",
    tag = "Notes",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Note ID")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated", body = Note),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 404, description = "No such note", body = ErrorBody)
    )
)]
pub async fn update_note(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    JsonBody(request): JsonBody<UpdateNoteRequest>,
) -> Result<Json<ItemEnvelope<Value>>, ApiError> {
    let notes = NoteRepository::new(state.store.as_ref());
    let mut preview = notes.get(&note_id).verify_owner(&user)?;

    if let Some(target) = request.notebook.as_deref() {
        if target != preview.notebook {
            referenced_notebook(&state, &user, target)?;
        }
    }

    let now = Utc::now();
    preview.apply(&request, now)?;

    let updated = notes
        .update_with(&note_id, |note| {
            note.user == user.user_id && note.apply(&request, now).is_ok()
        })?
        .ok_or_else(ApiError::no_document)?;
    Ok(Json(ItemEnvelope::new(public_document(&updated, &NOTES)?)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/notes/{id}",
    tag = "Notes",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Note ID")),
    responses(
        (status = 204, description = "Note deleted"),
        (status = 404, description = "No such note", body = ErrorBody)
    )
)]
pub async fn delete_note(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let notes = NoteRepository::new(state.store.as_ref());
    let note = notes.get(&note_id).verify_owner(&user)?;
    notes.delete(&note.id)?;
    tracing::info!(user_id = %user.user_id, note_id = %note.id, "Note deleted");
    Ok(StatusCode::NO_CONTENT)
}
