use crate::document::{json_kind, Document, Record};
use crate::error::{MockApiError, Result};
use crate::query::{stringify, ListQuery};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Result of re-reading the backing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// File content matches what is already in memory.
    Unchanged,
    Reloaded { collections: usize, records: usize },
}

struct StoreState {
    document: Document,
    /// Highest integer id ever seen per collection.
    counters: HashMap<String, u64>,
}

impl StoreState {
    fn new(document: Document) -> Self {
        let counters = document
            .collections()
            .map(|(name, records)| (name.to_string(), max_integer_id(records)))
            .collect();
        StoreState { document, counters }
    }

    fn records(&self, collection: &str) -> Result<&Vec<Record>> {
        self.document
            .collection(collection)
            .ok_or_else(|| MockApiError::collection_not_found(collection))
    }

    fn records_mut(&mut self, collection: &str) -> Result<&mut Vec<Record>> {
        self.document
            .collection_mut(collection)
            .ok_or_else(|| MockApiError::collection_not_found(collection))
    }
}

/// The main entry point for mockapi.
/// Owns the document loaded from a JSON file and rewrites that file after
/// every mutation. All mutations hold the write lock until the file is saved.
pub struct Store {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl Store {
    /// Open a store backed by the JSON file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let document = Document::read(&path)?;
        log::debug!(
            "Loaded {} collection(s), {} record(s) from {}",
            document.len(),
            document.total_records(),
            path.display()
        );
        Ok(Store {
            path,
            state: RwLock::new(StoreState::new(document)),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.read().document.names().map(str::to_string).collect()
    }

    /// A copy of the current in-memory document.
    pub fn snapshot(&self) -> Document {
        self.read().document.clone()
    }

    pub fn list(&self, collection: &str) -> Result<Vec<Record>> {
        Ok(self.read().records(collection)?.clone())
    }

    /// List a collection through the query engine.
    pub fn query(&self, collection: &str, query: &ListQuery) -> Result<Vec<Record>> {
        let state = self.read();
        Ok(query.apply(state.records(collection)?))
    }

    pub fn get(&self, collection: &str, id: &str) -> Result<Record> {
        let state = self.read();
        state
            .records(collection)?
            .iter()
            .find(|r| has_id(r, id))
            .cloned()
            .ok_or_else(|| MockApiError::record_not_found(collection, id))
    }

    /// Append a new record. Assigns the next integer id unless `body` has one.
    pub fn create(&self, collection: &str, body: Value) -> Result<Record> {
        let record = into_record(body)?;
        let mut state = self.write();
        let records = state.records(collection)?;

        let id = match record.get("id") {
            None | Some(Value::Null) => None,
            Some(id @ (Value::Number(_) | Value::String(_))) => {
                if id.is_number() && id.as_u64().is_none() {
                    return Err(MockApiError::Validation(format!(
                        "id must be a non-negative integer or a string, got {id}"
                    )));
                }
                let id_str = stringify(id);
                if records.iter().any(|r| has_id(r, &id_str)) {
                    return Err(MockApiError::Conflict(format!(
                        "duplicate id {id_str} in '{collection}'"
                    )));
                }
                Some(id.clone())
            }
            Some(other) => {
                return Err(MockApiError::Validation(format!(
                    "id must be an integer or a string, got {}",
                    json_kind(other)
                )))
            }
        };

        let counter = state.counters.entry(collection.to_string()).or_insert(0);
        let id = match id {
            Some(id) => {
                if let Some(n) = id.as_u64() {
                    *counter = (*counter).max(n);
                }
                id
            }
            None => {
                *counter = counter.checked_add(1).ok_or_else(|| {
                    MockApiError::Validation(format!("no integer ids left in '{collection}'"))
                })?;
                Value::from(*counter)
            }
        };

        // id goes first so the stored record reads naturally in the file
        let mut stored = Record::with_capacity(record.len() + 1);
        stored.insert("id".to_string(), id);
        stored.extend(record.into_iter().filter(|(key, _)| key != "id"));

        state.records_mut(collection)?.push(stored.clone());
        log::debug!("Created {collection}/{}", stringify(&stored["id"]));
        self.persist(&state)?;
        Ok(stored)
    }

    /// Shallow-merge `body` into an existing record. The `id` field cannot change.
    pub fn update(&self, collection: &str, id: &str, body: Value) -> Result<Record> {
        let patch = into_record(body)?;

        let mut state = self.write();
        let record = state
            .records_mut(collection)?
            .iter_mut()
            .find(|r| has_id(r, id))
            .ok_or_else(|| MockApiError::record_not_found(collection, id))?;

        for (key, value) in patch.into_iter().filter(|(key, _)| key != "id") {
            record.insert(key, value);
        }
        let updated = record.clone();

        log::debug!("Updated {collection}/{id}");
        self.persist(&state)?;
        Ok(updated)
    }

    pub fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut state = self.write();
        let records = state.records_mut(collection)?;
        let index = records
            .iter()
            .position(|r| has_id(r, id))
            .ok_or_else(|| MockApiError::record_not_found(collection, id))?;
        records.remove(index);

        log::debug!("Deleted {collection}/{id}");
        self.persist(&state)
    }

    /// Re-read the backing file and replace the in-memory document.
    /// On failure the current document stays in place.
    ///
    /// The file is read under the write lock, so no mutation can persist
    /// between the read and the swap.
    pub fn reload(&self) -> Result<ReloadOutcome> {
        let mut state = self.write();
        let document = Document::read(&self.path)?;
        if state.document == document {
            return Ok(ReloadOutcome::Unchanged);
        }

        let mut fresh = StoreState::new(document);
        for (name, counter) in fresh.counters.iter_mut() {
            if let Some(previous) = state.counters.get(name) {
                *counter = (*counter).max(*previous);
            }
        }

        let outcome = ReloadOutcome::Reloaded {
            collections: fresh.document.len(),
            records: fresh.document.total_records(),
        };
        *state = fresh;
        Ok(outcome)
    }

    fn persist(&self, state: &StoreState) -> Result<()> {
        state.document.write(&self.path).map_err(|e| {
            log::error!("In-memory data is ahead of {}: {e}", self.path.display());
            e
        })
    }

    // A poisoned lock still guards a structurally valid document.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn into_record(body: Value) -> Result<Record> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(MockApiError::Validation(format!(
            "Request body must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn has_id(record: &Record, id: &str) -> bool {
    record.get("id").is_some_and(|v| stringify(v) == id)
}

fn max_integer_id(records: &[Record]) -> u64 {
    records
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_u64))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup_test_store(data: Value) -> (TempDir, Store) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.json");
        std::fs::write(&path, serde_json::to_string_pretty(&data).unwrap()).unwrap();
        let store = Store::open(&path).unwrap();
        (tmp, store)
    }

    fn sample() -> Value {
        json!({
            "users": [
                { "id": 1, "name": "Alice", "email": "alice@example.com" },
                { "id": 2, "name": "Bob", "email": "bob@example.com" }
            ],
            "posts": [
                { "id": 1, "title": "Hello", "userId": 1 }
            ],
            "tags": []
        })
    }

    fn on_disk(store: &Store) -> Value {
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap()
    }

    #[test]
    fn test_open_store() {
        let (_tmp, store) = setup_test_store(sample());
        assert_eq!(store.collection_names(), vec!["users", "posts", "tags"]);
        assert_eq!(store.list("users").unwrap().len(), 2);
    }

    #[test]
    fn test_collection_not_found() {
        let (_tmp, store) = setup_test_store(sample());
        assert!(matches!(
            store.list("nope"),
            Err(MockApiError::NotFound { id: None, .. })
        ));
        assert!(matches!(
            store.create("nope", json!({})),
            Err(MockApiError::NotFound { .. })
        ));
    }

    #[test]
    fn test_get_by_id() {
        let (_tmp, store) = setup_test_store(sample());
        assert_eq!(store.get("users", "2").unwrap()["name"], json!("Bob"));
        assert!(matches!(
            store.get("users", "999"),
            Err(MockApiError::NotFound { id: Some(_), .. })
        ));
    }

    #[test]
    fn test_string_ids() {
        let (_tmp, store) = setup_test_store(json!({
            "slugs": [{ "id": "home", "title": "Home" }]
        }));
        assert_eq!(store.get("slugs", "home").unwrap()["title"], json!("Home"));

        let created = store.create("slugs", json!({ "title": "Next" })).unwrap();
        assert_eq!(created["id"], json!(1));
    }

    #[test]
    fn test_create_assigns_next_id_and_persists() {
        let (_tmp, store) = setup_test_store(json!({
            "users": [{ "id": 1, "name": "Alice" }]
        }));

        let bob = store.create("users", json!({ "name": "Bob" })).unwrap();
        assert_eq!(Value::Object(bob), json!({ "id": 2, "name": "Bob" }));

        let names: Vec<_> = store
            .list("users")
            .unwrap()
            .iter()
            .map(|r| r["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("Alice"), json!("Bob")]);
        assert_eq!(on_disk(&store)["users"][1], json!({ "id": 2, "name": "Bob" }));
    }

    #[test]
    fn test_create_in_empty_collection_starts_at_one() {
        let (_tmp, store) = setup_test_store(sample());
        let tag = store.create("tags", json!({ "label": "rust" })).unwrap();
        assert_eq!(tag["id"], json!(1));
    }

    #[test]
    fn test_create_ids_are_monotonic_after_delete() {
        let (_tmp, store) = setup_test_store(sample());
        let third = store.create("users", json!({ "name": "Carol" })).unwrap();
        assert_eq!(third["id"], json!(3));

        store.delete("users", "3").unwrap();
        let fourth = store.create("users", json!({ "name": "Dave" })).unwrap();
        assert_eq!(fourth["id"], json!(4));
    }

    #[test]
    fn test_create_with_explicit_id() {
        let (_tmp, store) = setup_test_store(sample());
        let user = store.create("users", json!({ "name": "Zed", "id": 10 })).unwrap();
        assert_eq!(user.keys().next().map(String::as_str), Some("id"));
        assert_eq!(user["id"], json!(10));

        let next = store.create("users", json!({ "name": "Next" })).unwrap();
        assert_eq!(next["id"], json!(11));
    }

    #[test]
    fn test_create_rejects_duplicate_id() {
        let (_tmp, store) = setup_test_store(sample());
        let err = store
            .create("users", json!({ "id": 1, "name": "Evil" }))
            .unwrap_err();
        assert!(matches!(err, MockApiError::Conflict(_)));
        assert_eq!(store.list("users").unwrap().len(), 2);
    }

    #[test]
    fn test_create_after_max_id_does_not_overflow() {
        let (_tmp, store) = setup_test_store(sample());
        store.create("users", json!({ "id": u64::MAX })).unwrap();

        let err = store.create("users", json!({ "name": "Next" })).unwrap_err();
        assert!(matches!(err, MockApiError::Validation(_)));
        assert_eq!(store.list("users").unwrap().len(), 3);

        // string ids are still accepted
        let tagged = store.create("users", json!({ "id": "next" })).unwrap();
        assert_eq!(tagged["id"], json!("next"));
    }

    #[test]
    fn test_create_rejects_bad_ids_and_bodies() {
        let (_tmp, store) = setup_test_store(sample());
        for body in [
            json!({ "id": true }),
            json!({ "id": [1] }),
            json!({ "id": -3 }),
            json!({ "id": 1.5 }),
            json!([1, 2]),
            json!("text"),
        ] {
            assert!(
                matches!(store.create("users", body.clone()), Err(MockApiError::Validation(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn test_update_merges_fields() {
        let (_tmp, store) = setup_test_store(sample());
        let before = store.get("users", "1").unwrap();
        assert_eq!(before["email"], json!("alice@example.com"));

        let updated = store
            .update("users", "1", json!({ "name": "Alice Updated", "role": "admin" }))
            .unwrap();
        assert_eq!(
            Value::Object(updated),
            json!({
                "id": 1,
                "name": "Alice Updated",
                "email": "alice@example.com",
                "role": "admin"
            })
        );

        let after = store.get("users", "1").unwrap();
        assert_eq!(after["email"], json!("alice@example.com"));
        assert_eq!(on_disk(&store)["users"][0]["name"], json!("Alice Updated"));
    }

    #[test]
    fn test_update_ignores_id_in_body() {
        let (_tmp, store) = setup_test_store(sample());
        let updated = store
            .update("users", "1", json!({ "id": 999, "name": "Mismatch" }))
            .unwrap();
        assert_eq!(updated["id"], json!(1));
        assert!(store.get("users", "999").is_err());
    }

    #[test]
    fn test_update_missing_record() {
        let (_tmp, store) = setup_test_store(sample());
        assert!(matches!(
            store.update("users", "42", json!({ "name": "x" })),
            Err(MockApiError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_then_get_is_not_found() {
        let (_tmp, store) = setup_test_store(sample());
        store.delete("users", "1").unwrap();
        assert!(matches!(
            store.get("users", "1"),
            Err(MockApiError::NotFound { .. })
        ));
        assert_eq!(on_disk(&store)["users"].as_array().unwrap().len(), 1);
        assert!(matches!(
            store.delete("users", "1"),
            Err(MockApiError::NotFound { .. })
        ));
    }

    #[test]
    fn test_query_through_store() {
        let (_tmp, store) = setup_test_store(sample());
        let q = ListQuery::parse([("name", "Alice")]).unwrap();
        let found = store.query("users", &q).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["id"], json!(1));
    }

    #[test]
    fn test_persisted_file_round_trips() {
        let (_tmp, store) = setup_test_store(sample());
        store.create("posts", json!({ "title": "Second", "userId": 2 })).unwrap();

        let reopened = Store::open(store.path()).unwrap();
        assert_eq!(reopened.snapshot(), store.snapshot());
    }

    #[test]
    fn test_reload_unchanged_after_own_write() {
        let (_tmp, store) = setup_test_store(sample());
        store.create("users", json!({ "name": "Carol" })).unwrap();
        assert_eq!(store.reload().unwrap(), ReloadOutcome::Unchanged);
    }

    #[test]
    fn test_reload_during_writes_keeps_every_record() {
        let (_tmp, store) = setup_test_store(sample());
        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..50 {
                    store.create("posts", json!({ "title": format!("p{i}") })).unwrap();
                }
            });
            s.spawn(|| {
                for _ in 0..50 {
                    // disk and memory always agree once the lock is held
                    assert_eq!(store.reload().unwrap(), ReloadOutcome::Unchanged);
                }
            });
        });

        assert_eq!(store.list("posts").unwrap().len(), 51);
        assert_eq!(on_disk(&store)["posts"].as_array().unwrap().len(), 51);
    }

    #[test]
    fn test_reload_picks_up_external_change() {
        let (_tmp, store) = setup_test_store(sample());
        store.create("users", json!({ "name": "Carol" })).unwrap();
        store.delete("users", "3").unwrap();

        std::fs::write(
            store.path(),
            r#"{ "users": [{ "id": 1, "name": "Only" }], "notes": [] }"#,
        )
        .unwrap();

        assert_eq!(
            store.reload().unwrap(),
            ReloadOutcome::Reloaded { collections: 2, records: 1 }
        );
        assert_eq!(store.collection_names(), vec!["users", "notes"]);

        // ids already handed out are not reused
        let next = store.create("users", json!({ "name": "New" })).unwrap();
        assert_eq!(next["id"], json!(4));
    }

    #[test]
    fn test_reload_keeps_document_on_bad_file() {
        let (_tmp, store) = setup_test_store(sample());
        std::fs::write(store.path(), "{ half written").unwrap();

        assert!(matches!(store.reload(), Err(MockApiError::Load { .. })));
        assert_eq!(store.list("users").unwrap().len(), 2);
    }

    #[test]
    fn test_persistence_error_keeps_memory() {
        let (tmp, store) = setup_test_store(sample());
        // Replace the backing file with a directory so the rename fails.
        std::fs::remove_file(store.path()).unwrap();
        std::fs::create_dir(tmp.path().join("db.json")).unwrap();

        let err = store.create("users", json!({ "name": "Carol" })).unwrap_err();
        assert!(matches!(err, MockApiError::Persistence { .. }));
        assert_eq!(store.list("users").unwrap().len(), 3);
    }
}
