//! Append-only log of accepted predictions.
//!
//! The whole log lives in one JSON blob. Every mutation is load-all, change,
//! persist-all; the last full write wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::{BlobStore, Result};

/// Key the history blob is stored under.
pub const HISTORY_KEY: &str = "sign_history";

/// One saved letter. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "letter")]
    pub label: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl HistoryEntry {
    pub fn new(label: impl Into<String>, timestamp: DateTime<Utc>, confidence: Option<f32>) -> Self {
        Self {
            label: label.into(),
            timestamp,
            confidence,
        }
    }
}

pub fn list_to_json_string(entries: &[HistoryEntry]) -> Result<String> {
    Ok(serde_json::to_string(entries)?)
}

pub fn list_from_json_string(json: &str) -> Result<Vec<HistoryEntry>> {
    Ok(serde_json::from_str(json)?)
}

/// History log over a [`BlobStore`].
///
/// `append` and `clear` hold a write lock for their whole read-modify-write,
/// so an append can never resurrect entries a concurrent clear removed.
pub struct HistoryStore {
    store: Arc<dyn BlobStore>,
    key: String,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_key(store, HISTORY_KEY)
    }

    pub fn with_key(store: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Read the full log. A missing, unreadable or corrupted blob is an empty log.
    pub fn load(&self) -> Vec<HistoryEntry> {
        match self.read() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to read history");
                Vec::new()
            }
        }
    }

    /// Read the log for a mutation. Store failures propagate so the caller
    /// never persists over entries it could not see; only a corrupted blob
    /// counts as empty.
    fn read(&self) -> Result<Vec<HistoryEntry>> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(Vec::new());
        };

        match list_from_json_string(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "history blob is corrupted, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Append one entry and return the log as persisted.
    ///
    /// Fails without writing if the current log cannot be read.
    pub fn append(&self, entry: HistoryEntry) -> Result<Vec<HistoryEntry>> {
        let _guard = self.write_lock.lock().expect("history lock poisoned");
        let mut entries = self.read()?;
        entries.push(entry);
        self.store.put(&self.key, &list_to_json_string(&entries)?)?;
        tracing::debug!(len = entries.len(), "history appended");
        Ok(entries)
    }

    /// Remove the persisted log entirely.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().expect("history lock poisoned");
        self.store.remove(&self.key)?;
        tracing::info!("history cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBlobStore;
    use chrono::TimeZone;

    fn entry(label: &str, secs: i64, confidence: Option<f32>) -> HistoryEntry {
        HistoryEntry::new(label, Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(), confidence)
    }

    #[test]
    fn test_persisted_layout() {
        let json = list_to_json_string(&[entry("A", 0, Some(0.5)), entry("B", 3, None)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["letter"], "A");
        assert_eq!(value[0]["confidence"], 0.5);
        assert_eq!(value[0]["timestamp"], "2023-11-14T22:13:20Z");
        assert!(value[1].get("confidence").is_none());
        assert!(value[1].get("label").is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let entries = vec![
            entry("A", 0, Some(0.91)),
            entry("B", 3, None),
            HistoryEntry::new("C", Utc::now(), Some(0.333)),
        ];
        let json = list_to_json_string(&entries).unwrap();
        assert_eq!(list_from_json_string(&json).unwrap(), entries);
    }

    #[test]
    fn test_reads_iso_timestamps_with_offset() {
        let json = r#"[{"letter":"H","timestamp":"2024-05-01T10:00:00.123+02:00"}]"#;
        let entries = list_from_json_string(json).unwrap();
        assert_eq!(entries[0].label, "H");
        assert_eq!(entries[0].timestamp.to_rfc3339(), "2024-05-01T08:00:00.123+00:00");
        assert_eq!(entries[0].confidence, None);
    }

    #[test]
    fn test_append_preserves_order() {
        let history = HistoryStore::new(Arc::new(MemoryBlobStore::new()));
        history.append(entry("A", 0, None)).unwrap();
        history.append(entry("B", 3, None)).unwrap();
        let all = history.append(entry("A", 6, None)).unwrap();

        let labels: Vec<_> = all.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["A", "B", "A"]);
        assert_eq!(history.load(), all);
    }

    #[test]
    fn test_load_corrupted_is_empty() {
        let store = Arc::new(MemoryBlobStore::new());
        store.put(HISTORY_KEY, "{not json").unwrap();
        let history = HistoryStore::new(store.clone());
        assert!(history.load().is_empty());

        store.put(HISTORY_KEY, r#"{"letter":"A"}"#).unwrap();
        assert!(history.load().is_empty());
    }

    #[test]
    fn test_append_after_corruption_starts_fresh() {
        let store = Arc::new(MemoryBlobStore::new());
        store.put(HISTORY_KEY, "garbage").unwrap();
        let history = HistoryStore::new(store);

        let all = history.append(entry("Z", 0, Some(0.7))).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(history.load()[0].label, "Z");
    }

    /// Store whose next `get` fails once.
    struct FlakyStore {
        inner: MemoryBlobStore,
        fail_next_get: std::sync::atomic::AtomicBool,
    }

    impl BlobStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            if self
                .fail_next_get
                .swap(false, std::sync::atomic::Ordering::SeqCst)
            {
                return Err(std::io::Error::other("disk unavailable").into());
            }
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &str) -> Result<()> {
            self.inner.put(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_append_with_failed_read_keeps_log() {
        let store = Arc::new(FlakyStore {
            inner: MemoryBlobStore::new(),
            fail_next_get: std::sync::atomic::AtomicBool::new(false),
        });
        let history = HistoryStore::new(store.clone());
        for (i, label) in ["H", "E", "L", "L", "O"].into_iter().enumerate() {
            history.append(entry(label, i as i64, None)).unwrap();
        }

        store
            .fail_next_get
            .store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(history.append(entry("X", 10, None)).is_err());
        assert_eq!(history.load().len(), 5);

        let all = history.append(entry("X", 10, None)).unwrap();
        let labels: Vec<_> = all.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["H", "E", "L", "L", "O", "X"]);
    }

    #[test]
    fn test_load_with_failed_read_is_empty() {
        let store = Arc::new(FlakyStore {
            inner: MemoryBlobStore::new(),
            fail_next_get: std::sync::atomic::AtomicBool::new(false),
        });
        let history = HistoryStore::new(store.clone());
        history.append(entry("A", 0, None)).unwrap();

        store
            .fail_next_get
            .store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(history.load().is_empty());
        assert_eq!(history.load().len(), 1);
    }

    #[test]
    fn test_clear_removes_blob() {
        let store = Arc::new(MemoryBlobStore::new());
        let history = HistoryStore::new(store.clone());
        history.append(entry("A", 0, None)).unwrap();

        history.clear().unwrap();
        assert!(history.load().is_empty());
        assert_eq!(store.get(HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn test_concurrent_appends_are_serialized() {
        let history = Arc::new(HistoryStore::new(Arc::new(MemoryBlobStore::new())));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let history = Arc::clone(&history);
                std::thread::spawn(move || {
                    for j in 0..10 {
                        history.append(entry(&format!("{i}"), j, None)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(history.load().len(), 80);
    }
}
