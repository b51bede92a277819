// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path layout for the file-backed document store.

use std::path::{Path, PathBuf};

use super::Collection;

/// Longest accepted document id.
pub const MAX_ID_LEN: usize = 128;

/// Whether `id` is safe to use as a file stem.
///
/// Only ASCII alphanumerics, `-` and `_` are accepted, which rules out path
/// separators and dot segments.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every document of a collection.
    pub fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.as_str())
    }

    /// Path to a single document. Callers must validate `id` first.
    pub fn document(&self, collection: Collection, id: &str) -> PathBuf {
        self.collection_dir(collection).join(format!("{id}.json"))
    }

    /// Scratch file used by the health check.
    pub fn health_probe(&self) -> PathBuf {
        self.root.join(".health_check")
    }
}
