// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the document store.
//!
//! Each repository provides CRUD operations for one entity type and
//! converts between the stored JSON documents and Rust records.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::{Collection, DocumentStore, StorageResult, UpdateOutcome};

pub mod notebooks;
pub mod notes;
pub mod users;

pub use notebooks::{Notebook, NotebookRepository};
pub use notes::{Note, NoteRepository};
pub use users::{PendingReset, StoredUser, UserRepository};

pub(crate) fn to_document<T: Serialize>(record: &T) -> StorageResult<Value> {
    Ok(serde_json::to_value(record)?)
}

pub(crate) fn from_document<T: DeserializeOwned>(document: Value) -> StorageResult<T> {
    Ok(serde_json::from_value(document)?)
}

/// Typed read-modify-write. `apply` returns `false` to leave the record
/// untouched. Yields the stored record only when the write happened.
pub(crate) fn update_typed<T, F>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
    mut apply: F,
) -> StorageResult<Option<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnMut(&mut T) -> bool,
{
    let outcome = store.update(collection, id, &mut |document| {
        let mut record: T = serde_json::from_value(document.clone())?;
        if !apply(&mut record) {
            return Ok(false);
        }
        *document = serde_json::to_value(&record)?;
        Ok(true)
    })?;

    match outcome {
        UpdateOutcome::Updated(document) => Ok(Some(from_document(document)?)),
        UpdateOutcome::Unchanged(_) | UpdateOutcome::Missing => Ok(None),
    }
}

/// Decode every document of a collection, skipping ones that no longer
/// match the record shape.
pub(crate) fn scan_typed<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
) -> StorageResult<Vec<T>> {
    let mut records = Vec::new();
    for document in store.scan(collection)? {
        match serde_json::from_value(document) {
            Ok(record) => records.push(record),
            Err(err) => tracing::warn!(%collection, error = %err, "Skipping undecodable document"),
        }
    }
    Ok(records)
}
