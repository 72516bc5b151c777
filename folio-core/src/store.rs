use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampMilliSeconds};

use crate::error::StoreError;
use crate::theme::ThemeSnapshot;
use crate::{document_scope_id, Position};

const BOOKMARK_KEY_PREFIX: &str = "folio.bookmarks.";

/// Host-provided persistence service, reduced to the get/put record surface
/// the reader actually uses.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

pub struct MemoryKeyValueStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// One JSON file per key under a root directory.
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{file_name}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.record_path(key);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(Some(buf))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.record_path(key);
        let tmp = path.with_extension("json.tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }
}

/// A saved reading position together with the presentation that was active
/// when it was recorded. Never mutated in place; a second bookmark at the
/// same start position replaces the first.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub start: Position,
    pub end: Position,
    #[serde(default)]
    pub toc_label: String,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub created_at: SystemTime,
    pub theme: ThemeSnapshot,
}

impl Bookmark {
    pub fn new(start: Position, end: Position, toc_label: String, theme: ThemeSnapshot) -> Self {
        Self {
            start,
            end,
            toc_label,
            created_at: SystemTime::now(),
            theme,
        }
    }
}

/// Bookmark record for one document: a mapping from start position to
/// bookmark, serialized as a single JSON value under a scoped key.
pub struct BookmarkStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl BookmarkStore {
    /// Scopes the record to a stable identifier derived from the document
    /// reference, so scoping never depends on metadata that may not have
    /// resolved yet.
    pub fn for_document(store: Arc<dyn KeyValueStore>, reference: &str) -> Self {
        let key = format!("{BOOKMARK_KEY_PREFIX}{}", document_scope_id(reference));
        Self { store, key }
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    fn read_record(&self) -> Result<BTreeMap<String, Bookmark>, StoreError> {
        match self.store.get(&self.key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(BTreeMap::new()),
        }
    }

    fn write_record(&self, record: &BTreeMap<String, Bookmark>) -> Result<(), StoreError> {
        let raw = serde_json::to_string(record)?;
        self.store.put(&self.key, &raw)
    }

    pub fn put(&self, bookmark: Bookmark) -> Result<(), StoreError> {
        let mut record = self.read_record()?;
        record.insert(bookmark.start.as_str().to_owned(), bookmark);
        self.write_record(&record)
    }

    pub fn remove(&self, position: &Position) -> Result<Option<Bookmark>, StoreError> {
        let mut record = self.read_record()?;
        let removed = record.remove(position.as_str());
        if removed.is_some() {
            self.write_record(&record)?;
        }
        Ok(removed)
    }

    pub fn contains(&self, position: &Position) -> Result<bool, StoreError> {
        Ok(self.read_record()?.contains_key(position.as_str()))
    }

    /// All bookmarks in storage iteration order. Callers needing chronology
    /// must sort by [`Bookmark::created_at`].
    pub fn get_all(&self) -> Result<Vec<Bookmark>, StoreError> {
        Ok(self.read_record()?.into_values().collect())
    }
}
