// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Note repository.
//!
//! Every note references its owning user and the notebook it lives in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use super::super::{Collection, DocumentStore, OwnedResource, StorageResult};
use super::{from_document, scan_typed, to_document, update_typed};
use crate::models::{
    check_note_fields, CreateNoteRequest, Location, UpdateNoteRequest, ValidationErrors,
    DEFAULT_NOTE_TITLE,
};

/// Note stored in `notes/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Notebook id
    pub notebook: String,
    /// Owner user id
    pub user: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl OwnedResource for Note {
    fn owner_user_id(&self) -> &str {
        &self.user
    }

    fn resource_name() -> &'static str {
        "note"
    }
}

impl Note {
    /// Build a note for `owner` inside `notebook_id`. The caller has already
    /// checked that the notebook belongs to `owner`.
    pub fn create(
        request: CreateNoteRequest,
        owner: &str,
        notebook_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationErrors> {
        check_note_fields(
            request.title.as_deref(),
            request.description.as_deref(),
            request.content.as_deref(),
            request.location.as_ref(),
        )?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title: request
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| DEFAULT_NOTE_TITLE.to_string()),
            description: request.description,
            content: request.content,
            location: request.location,
            favorite: request.favorite.unwrap_or(false),
            created_at: now,
            updated_at: None,
            notebook: notebook_id.to_string(),
            user: owner.to_string(),
            active: true,
        })
    }

    /// Apply a partial update. A notebook move must be ownership-checked by
    /// the caller before it gets here.
    pub fn apply(
        &mut self,
        request: &UpdateNoteRequest,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationErrors> {
        check_note_fields(
            request.title.as_deref(),
            request.description.as_deref(),
            request.content.as_deref(),
            request.location.as_ref(),
        )?;

        if let Some(title) = &request.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = &request.description {
            self.description = Some(description.clone());
        }
        if let Some(content) = &request.content {
            self.content = Some(content.clone());
        }
        if let Some(location) = &request.location {
            self.location = Some(location.clone());
        }
        if let Some(favorite) = request.favorite {
            self.favorite = favorite;
        }
        if let Some(notebook) = &request.notebook {
            self.notebook = notebook.clone();
        }
        self.updated_at = Some(now);
        Ok(())
    }
}

/// Repository for note operations.
pub struct NoteRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> NoteRepository<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub fn create(&self, note: &Note) -> StorageResult<()> {
        self.store
            .insert(Collection::Notes, &note.id, &to_document(note)?)
    }

    pub fn get(&self, note_id: &str) -> StorageResult<Option<Note>> {
        self.store
            .get(Collection::Notes, note_id)?
            .map(from_document)
            .transpose()
    }

    pub fn update_with<F>(&self, note_id: &str, apply: F) -> StorageResult<Option<Note>>
    where
        F: FnMut(&mut Note) -> bool,
    {
        update_typed(self.store, Collection::Notes, note_id, apply)
    }

    pub fn delete(&self, note_id: &str) -> StorageResult<bool> {
        self.store.delete(Collection::Notes, note_id)
    }

    pub fn list_all(&self) -> StorageResult<Vec<Note>> {
        scan_typed(self.store, Collection::Notes)
    }

    /// Notes of one owner inside one notebook.
    pub fn list_in_notebook(&self, owner: &str, notebook_id: &str) -> StorageResult<Vec<Note>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|note| note.user == owner && note.notebook == notebook_id)
            .collect())
    }

    /// Remove every note in a notebook. Returns how many were deleted.
    pub fn delete_in_notebook(&self, notebook_id: &str) -> StorageResult<usize> {
        let mut deleted = 0;
        for note in self.list_all()? {
            if note.notebook == notebook_id && self.delete(&note.id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Raw documents, as consumed by the query engine.
    pub fn documents(&self) -> StorageResult<Vec<Value>> {
        self.store.scan(Collection::Notes)
    }
}
