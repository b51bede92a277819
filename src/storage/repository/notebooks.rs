// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Notebook repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use super::super::{Collection, DocumentStore, OwnedResource, StorageResult};
use super::{from_document, scan_typed, to_document, update_typed};
use crate::models::{
    check_notebook_title, CreateNotebookRequest, UpdateNotebookRequest, ValidationErrors,
    DEFAULT_NOTEBOOK_COLOR,
};

/// Notebook stored in `notebooks/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    pub id: String,
    pub title: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    /// Owner user id
    pub user: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl OwnedResource for Notebook {
    fn owner_user_id(&self) -> &str {
        &self.user
    }

    fn resource_name() -> &'static str {
        "notebook"
    }
}

impl Notebook {
    /// Build a notebook for `owner`. Any owner named in the request body is
    /// never consulted.
    pub fn create(
        request: CreateNotebookRequest,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_notebook_title(request.title.as_deref(), &mut errors);
        errors.into_result()?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title: request.title.unwrap_or_default().trim().to_string(),
            color: request
                .color
                .unwrap_or_else(|| DEFAULT_NOTEBOOK_COLOR.to_string()),
            created_at: now,
            user: owner.to_string(),
            active: true,
        })
    }

    /// Apply a partial update. Owner and creation time never change.
    pub fn apply(&mut self, request: &UpdateNotebookRequest) -> Result<(), ValidationErrors> {
        if let Some(title) = request.title.as_deref() {
            let mut errors = ValidationErrors::new();
            check_notebook_title(Some(title), &mut errors);
            errors.into_result()?;
            self.title = title.trim().to_string();
        }
        if let Some(color) = &request.color {
            self.color = color.clone();
        }
        Ok(())
    }
}

/// Repository for notebook operations.
pub struct NotebookRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> NotebookRepository<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub fn create(&self, notebook: &Notebook) -> StorageResult<()> {
        self.store
            .insert(Collection::Notebooks, &notebook.id, &to_document(notebook)?)
    }

    pub fn get(&self, notebook_id: &str) -> StorageResult<Option<Notebook>> {
        self.store
            .get(Collection::Notebooks, notebook_id)?
            .map(from_document)
            .transpose()
    }

    pub fn update_with<F>(&self, notebook_id: &str, apply: F) -> StorageResult<Option<Notebook>>
    where
        F: FnMut(&mut Notebook) -> bool,
    {
        update_typed(self.store, Collection::Notebooks, notebook_id, apply)
    }

    pub fn delete(&self, notebook_id: &str) -> StorageResult<bool> {
        self.store.delete(Collection::Notebooks, notebook_id)
    }

    pub fn list_all(&self) -> StorageResult<Vec<Notebook>> {
        scan_typed(self.store, Collection::Notebooks)
    }

    /// Raw documents, as consumed by the query engine.
    pub fn documents(&self) -> StorageResult<Vec<Value>> {
        self.store.scan(Collection::Notebooks)
    }
}
