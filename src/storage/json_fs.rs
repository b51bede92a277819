// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File-backed document store.
//!
//! Each document is a pretty-printed JSON file. Writes go to a temp file
//! that is renamed over the target, so readers see either the old or the
//! new document. Writers are serialized by a process-wide mutex, which is
//! what makes `insert` create-if-absent and `update` read-modify-write
//! atomic.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde_json::Value;

use super::paths::is_valid_id;
use super::{
    Collection, DocumentStore, StorageError, StoragePaths, StorageResult, UpdateFn, UpdateOutcome,
};

#[derive(Debug)]
pub struct JsonFileStore {
    paths: StoragePaths,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (and lay out) a store rooted at `root`.
    ///
    /// Safe to call on an existing directory.
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let paths = StoragePaths::new(root);
        for collection in Collection::ALL {
            fs::create_dir_all(paths.collection_dir(collection))?;
        }
        Ok(Self {
            paths,
            write_lock: Mutex::new(()),
        })
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    fn read_json(&self, path: &Path) -> StorageResult<Value> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write a JSON file (atomic write via rename).
    fn write_json(&self, path: &Path, value: &Value) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
            writer
                .into_inner()
                .map_err(|e| StorageError::Io(e.into_error()))?
                .sync_all()?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    fn list_ids(&self, collection: Collection) -> StorageResult<Vec<String>> {
        let dir = self.paths.collection_dir(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) {
                if is_valid_id(id) {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl DocumentStore for JsonFileStore {
    fn insert(&self, collection: Collection, id: &str, document: &Value) -> StorageResult<()> {
        if !is_valid_id(id) {
            return Err(StorageError::InvalidId(id.to_string()));
        }
        let _guard = self.lock()?;
        let path = self.paths.document(collection, id);
        if path.exists() {
            return Err(StorageError::AlreadyExists(format!("{collection}/{id}")));
        }
        self.write_json(&path, document)
    }

    fn get(&self, collection: Collection, id: &str) -> StorageResult<Option<Value>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        match self.read_json(&self.paths.document(collection, id)) {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn update(
        &self,
        collection: Collection,
        id: &str,
        apply: &mut UpdateFn<'_>,
    ) -> StorageResult<UpdateOutcome> {
        if !is_valid_id(id) {
            return Ok(UpdateOutcome::Missing);
        }
        let _guard = self.lock()?;
        let path = self.paths.document(collection, id);
        let mut document = match self.read_json(&path) {
            Ok(value) => value,
            Err(StorageError::NotFound(_)) => return Ok(UpdateOutcome::Missing),
            Err(e) => return Err(e),
        };

        let original = document.clone();
        if apply(&mut document)? {
            self.write_json(&path, &document)?;
            Ok(UpdateOutcome::Updated(document))
        } else {
            Ok(UpdateOutcome::Unchanged(original))
        }
    }

    fn delete(&self, collection: Collection, id: &str) -> StorageResult<bool> {
        if !is_valid_id(id) {
            return Ok(false);
        }
        let _guard = self.lock()?;
        match fs::remove_file(self.paths.document(collection, id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn scan(&self, collection: Collection) -> StorageResult<Vec<Value>> {
        let mut documents = Vec::new();
        for id in self.list_ids(collection)? {
            // A concurrent delete between listing and reading is not an error.
            match self.read_json(&self.paths.document(collection, &id)) {
                Ok(value) => documents.push(value),
                Err(StorageError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(documents)
    }

    /// Write-read-delete probe against the data directory. Probes share one
    /// file, so they run under the write lock.
    fn health_check(&self) -> StorageResult<()> {
        let probe = self.paths.health_probe();
        let payload = b"health_check_data";

        let _guard = self.lock()?;
        fs::write(&probe, payload)?;
        let read_back = fs::read(&probe)?;
        fs::remove_file(&probe)?;

        if read_back != payload {
            return Err(StorageError::IntegrityViolation(
                "Health check data mismatch".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, JsonFileStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn open_creates_collection_directories() {
        let (_dir, store) = test_store();
        for collection in Collection::ALL {
            assert!(store.paths().collection_dir(collection).is_dir());
        }
    }

    #[test]
    fn insert_then_get_round_trips_through_disk() {
        let (dir, store) = test_store();
        let doc = json!({"id": "n1", "title": "Groceries"});
        store.insert(Collection::Notes, "n1", &doc).unwrap();

        assert!(dir.path().join("notes/n1.json").is_file());
        assert_eq!(store.get(Collection::Notes, "n1").unwrap(), Some(doc));

        // A fresh handle on the same directory sees the data.
        let reopened = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.scan(Collection::Notes).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let (_dir, store) = test_store();
        store
            .insert(Collection::UserEmails, "abc", &json!({"userId": "u1"}))
            .unwrap();
        let err = store
            .insert(Collection::UserEmails, "abc", &json!({"userId": "u2"}))
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn invalid_ids_never_touch_the_filesystem() {
        let (_dir, store) = test_store();
        let err = store
            .insert(Collection::Notes, "../escape", &json!({}))
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidId(_)));
        assert_eq!(store.get(Collection::Notes, "../escape").unwrap(), None);
        assert!(!store.delete(Collection::Notes, "../escape").unwrap());
    }

    #[test]
    fn update_persists_only_when_applied() {
        let (_dir, store) = test_store();
        store
            .insert(Collection::Users, "u1", &json!({"active": true}))
            .unwrap();

        let outcome = store
            .update(Collection::Users, "u1", &mut |doc| {
                doc["active"] = json!(false);
                Ok(true)
            })
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(_)));
        assert_eq!(
            store.get(Collection::Users, "u1").unwrap().unwrap()["active"],
            json!(false)
        );

        let outcome = store
            .update(Collection::Users, "u1", &mut |doc| {
                doc["active"] = json!(true);
                Ok(false)
            })
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Unchanged(_)));
        assert_eq!(
            store.get(Collection::Users, "u1").unwrap().unwrap()["active"],
            json!(false)
        );
    }

    #[test]
    fn delete_and_scan() {
        let (_dir, store) = test_store();
        store.insert(Collection::Notes, "a", &json!({"id": "a"})).unwrap();
        store.insert(Collection::Notes, "b", &json!({"id": "b"})).unwrap();

        assert!(store.delete(Collection::Notes, "a").unwrap());
        assert!(!store.delete(Collection::Notes, "a").unwrap());

        let remaining = store.scan(Collection::Notes).unwrap();
        assert_eq!(remaining, vec![json!({"id": "b"})]);
    }

    #[test]
    fn health_check_passes_on_writable_dir() {
        let (_dir, store) = test_store();
        assert!(store.health_check().is_ok());
    }

    #[test]
    fn concurrent_health_checks_all_pass() {
        let (_dir, store) = test_store();
        std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| (0..25).all(|_| store.health_check().is_ok())))
                .collect();
            for worker in workers {
                assert!(worker.join().unwrap());
            }
        });
    }
}
