// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Document Storage
//!
//! Persistent state lives in a small document store: each record is a JSON
//! object addressed by `(collection, id)`. Two backends implement
//! [`DocumentStore`]:
//!
//! - [`MemoryStore`] keeps everything in process memory (tests, demos).
//! - [`JsonFileStore`] writes one JSON file per document under `DATA_DIR`.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   users/{user_id}.json
//!   user_emails/{sha256(email)}.json   # unique email index
//!   notebooks/{notebook_id}.json
//!   notes/{note_id}.json
//! ```
//!
//! ## Consistency
//!
//! - `insert` is create-if-absent, so a unique key can be claimed by
//!   inserting into an index collection.
//! - `update` runs a read-modify-write closure atomically with respect to
//!   other writers of the same store. The closure may decline the write,
//!   which is how conditional updates (e.g. consuming a reset secret) are
//!   expressed.
//! - Every write replaces the whole document; readers never observe a
//!   partially written record.

use std::fmt;
use std::io;

use serde_json::Value;

pub mod json_fs;
pub mod memory;
pub mod ownership;
pub mod paths;
pub mod repository;

pub use json_fs::JsonFileStore;
pub use memory::MemoryStore;
pub use ownership::{OwnedResource, OwnershipCheck};
pub use paths::StoragePaths;
pub use repository::{
    Note, NoteRepository, Notebook, NotebookRepository, PendingReset, StoredUser, UserRepository,
};

/// Named groups of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    /// Unique index from normalized email digest to user id.
    UserEmails,
    Notebooks,
    Notes,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::UserEmails,
        Collection::Notebooks,
        Collection::Notes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::UserEmails => "user_emails",
            Collection::Notebooks => "notebooks",
            Collection::Notes => "notes",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations
    Io(io::Error),
    /// JSON serialization/deserialization error
    Json(serde_json::Error),
    /// Document not found
    NotFound(String),
    /// Document already exists
    AlreadyExists(String),
    /// Identifier cannot be used as a document key
    InvalidId(String),
    /// Stored data failed a consistency check
    IntegrityViolation(String),
    /// A writer panicked while holding the store lock
    LockPoisoned,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Json(e) => write!(f, "JSON error: {e}"),
            StorageError::NotFound(entity) => write!(f, "Not found: {entity}"),
            StorageError::AlreadyExists(entity) => write!(f, "Already exists: {entity}"),
            StorageError::InvalidId(id) => write!(f, "Invalid document id: {id}"),
            StorageError::IntegrityViolation(msg) => write!(f, "Integrity violation: {msg}"),
            StorageError::LockPoisoned => write!(f, "Storage lock poisoned"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result of a read-modify-write call.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// No document with that id.
    Missing,
    /// The closure declined the write; the stored document is returned as is.
    Unchanged(Value),
    /// The closure's changes were persisted.
    Updated(Value),
}

/// Closure applied by [`DocumentStore::update`]. Returning `Ok(false)`
/// leaves the stored document untouched.
pub type UpdateFn<'a> = dyn FnMut(&mut Value) -> StorageResult<bool> + 'a;

/// Backend-neutral document store.
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. Fails with `AlreadyExists` if the id is taken.
    fn insert(&self, collection: Collection, id: &str, document: &Value) -> StorageResult<()>;

    /// Fetch a document by id.
    fn get(&self, collection: Collection, id: &str) -> StorageResult<Option<Value>>;

    /// Atomically read, modify and write back a document.
    fn update(
        &self,
        collection: Collection,
        id: &str,
        apply: &mut UpdateFn<'_>,
    ) -> StorageResult<UpdateOutcome>;

    /// Delete a document. Returns whether it existed.
    fn delete(&self, collection: Collection, id: &str) -> StorageResult<bool>;

    /// Every document in a collection.
    fn scan(&self, collection: Collection) -> StorageResult<Vec<Value>>;

    /// Verify the backend is usable.
    fn health_check(&self) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_are_stable() {
        let names: Vec<&str> = Collection::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["users", "user_emails", "notebooks", "notes"]);
        assert_eq!(Collection::Notes.to_string(), "notes");
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err: StorageError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, StorageError::NotFound(_)));

        let err: StorageError = io::Error::other("disk on fire").into();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
