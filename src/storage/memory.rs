// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde_json::Value;

use super::{Collection, DocumentStore, StorageError, StorageResult, UpdateFn, UpdateOutcome};

type Documents = HashMap<Collection, BTreeMap<String, Value>>;

/// Document store backed by a map guarded by a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn insert(&self, collection: Collection, id: &str, document: &Value) -> StorageResult<()> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let docs = guard.entry(collection).or_default();
        if docs.contains_key(id) {
            return Err(StorageError::AlreadyExists(format!("{collection}/{id}")));
        }
        docs.insert(id.to_string(), document.clone());
        Ok(())
    }

    fn get(&self, collection: Collection, id: &str) -> StorageResult<Option<Value>> {
        let guard = self
            .collections
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(guard.get(&collection).and_then(|docs| docs.get(id)).cloned())
    }

    fn update(
        &self,
        collection: Collection,
        id: &str,
        apply: &mut UpdateFn<'_>,
    ) -> StorageResult<UpdateOutcome> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let Some(current) = guard.get_mut(&collection).and_then(|docs| docs.get_mut(id)) else {
            return Ok(UpdateOutcome::Missing);
        };

        // Work on a copy so a failing closure leaves the stored value intact.
        let mut draft = current.clone();
        if apply(&mut draft)? {
            *current = draft.clone();
            Ok(UpdateOutcome::Updated(draft))
        } else {
            Ok(UpdateOutcome::Unchanged(current.clone()))
        }
    }

    fn delete(&self, collection: Collection, id: &str) -> StorageResult<bool> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(guard
            .get_mut(&collection)
            .map(|docs| docs.remove(id).is_some())
            .unwrap_or(false))
    }

    fn scan(&self, collection: Collection) -> StorageResult<Vec<Value>> {
        let guard = self
            .collections
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(guard
            .get(&collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    fn health_check(&self) -> StorageResult<()> {
        self.collections
            .read()
            .map(|_| ())
            .map_err(|_| StorageError::LockPoisoned)
    }
}
