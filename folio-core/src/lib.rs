use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod config;
pub mod engine;
pub mod error;
pub mod search;
pub mod session;
pub mod store;
pub mod theme;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ReaderConfig;
pub use engine::{
    DocumentEngine, EngineProvider, EngineResult, Location, LocationEdge, PageProgress, Rendition,
    RuleSet, SpineMatch,
};
pub use error::{EngineError, Error, Result, StoreError};
pub use search::{SearchResult, RESULT_LIMIT};
pub use session::{ReadingSession, SessionState};
pub use store::{Bookmark, BookmarkStore, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use theme::{ThemeAxis, ThemeSnapshot, ThemeValue};

static BOOKMARK_NAMESPACE: Lazy<Uuid> = Lazy::new(|| {
    Uuid::parse_str("3f1a6b90-0d2c-5e47-9b1f-8a4c2d7e6f01").expect("valid namespace UUID")
});

/// Stable scope identifier for a document reference. Bookmarks are keyed by
/// this rather than by the document title, which may be unresolved or shared
/// between unrelated documents at the time a bookmark is written.
pub fn document_scope_id(reference: &str) -> Uuid {
    Uuid::new_v5(&BOOKMARK_NAMESPACE, reference.as_bytes())
}

/// Opaque location cursor ("canonical fragment identifier") issued by the
/// rendering engine. Stable across reloads of the same document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(String);

impl Position {
    pub fn new(cursor: impl Into<String>) -> Self {
        Self(cursor.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Position {
    fn from(cursor: &str) -> Self {
        Self(cursor.to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// One entry of the document's table of contents, as exposed by the engine's
/// structural index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub creator: Option<String>,
}
