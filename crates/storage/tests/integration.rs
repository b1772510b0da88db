//! Integration tests for the storage crate.
//!
//! Uses in-memory SQLite for fast, isolated tests and temp dirs for reopen checks.

use chrono::Utc;
use signlens_storage::{
    BlobStore, Database, HistoryEntry, HistoryStore, MemoryBlobStore, HISTORY_KEY,
};
use std::sync::Arc;

fn create_test_db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().expect("Failed to create in-memory database"))
}

fn create_test_entry(label: &str) -> HistoryEntry {
    HistoryEntry::new(label, Utc::now(), Some(0.8))
}

// =============================================================================
// Database Initialization Tests
// =============================================================================

mod initialization {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok(), "Should create in-memory database");
    }

    #[test]
    fn test_open_file_database_creates_parent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("signlens.db");

        let db = Database::open(&db_path);
        assert!(db.is_ok(), "Should create file-based database");
        assert!(db_path.exists(), "Database file should exist");
    }

    #[test]
    fn test_reopen_existing_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("signlens.db");

        {
            let db = Arc::new(Database::open(&db_path).unwrap());
            let history = HistoryStore::new(db);
            history.append(create_test_entry("A")).unwrap();
            history.append(create_test_entry("B")).unwrap();
        }

        {
            let db = Arc::new(Database::open(&db_path).unwrap());
            let history = HistoryStore::new(db);
            let entries = history.load();
            assert_eq!(entries.len(), 2, "History should persist after reopen");
            assert_eq!(entries[0].label, "A");
            assert_eq!(entries[1].label, "B");
        }
    }

    #[test]
    fn test_invalid_path_fails() {
        let result = Database::open(&PathBuf::from("/dev/null/signlens.db"));
        assert!(result.is_err(), "Should fail with invalid path");
    }
}

// =============================================================================
// Blob Store Tests
// =============================================================================

mod blobs {
    use super::*;

    fn exercise(store: &dyn BlobStore) {
        assert_eq!(store.get("missing").unwrap(), None);

        store.put("k", "v1").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v1"));

        store.put("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);

        // Removing a missing key is not an error.
        store.remove("k").unwrap();
    }

    #[test]
    fn test_database_blob_store() {
        exercise(create_test_db().as_ref());
    }

    #[test]
    fn test_memory_blob_store() {
        exercise(&MemoryBlobStore::new());
    }

    #[test]
    fn test_keys_are_independent() {
        let db = create_test_db();
        db.put("a", "1").unwrap();
        db.put("b", "2").unwrap();
        db.remove("a").unwrap();
        assert_eq!(db.get("b").unwrap().as_deref(), Some("2"));
    }
}

// =============================================================================
// History Tests
// =============================================================================

mod history {
    use super::*;

    #[test]
    fn test_empty_history() {
        let history = HistoryStore::new(create_test_db());
        assert!(history.load().is_empty());
    }

    #[test]
    fn test_append_and_load_preserve_fields() {
        let history = HistoryStore::new(create_test_db());
        let entry = HistoryEntry::new("Q", Utc::now(), Some(0.42));
        history.append(entry.clone()).unwrap();

        let loaded = history.load();
        assert_eq!(loaded, vec![entry]);
    }

    #[test]
    fn test_corrupted_blob_loads_empty() {
        let db = create_test_db();
        db.put(HISTORY_KEY, "[{\"letter\": \"A\", \"timestamp\": 12").unwrap();

        let history = HistoryStore::new(db);
        assert!(history.load().is_empty());
    }

    #[test]
    fn test_clear_then_append() {
        let db = create_test_db();
        let history = HistoryStore::new(db.clone());
        history.append(create_test_entry("A")).unwrap();
        history.append(create_test_entry("B")).unwrap();

        history.clear().unwrap();
        assert_eq!(db.get(HISTORY_KEY).unwrap(), None);

        history.append(create_test_entry("C")).unwrap();
        let labels: Vec<_> = history.load().into_iter().map(|e| e.label).collect();
        assert_eq!(labels, ["C"]);
    }

    #[test]
    fn test_custom_key_is_isolated() {
        let db = create_test_db();
        let primary = HistoryStore::new(db.clone());
        let other = HistoryStore::with_key(db, "other_history");

        primary.append(create_test_entry("A")).unwrap();
        assert!(other.load().is_empty());
    }
}
