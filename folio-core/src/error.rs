use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by [`crate::ReadingSession`] operations.
///
/// A rejected operation never leaves the session partially updated: callers
/// can retry (re-navigate, reload) without repairing state first.
#[derive(Debug, Error)]
pub enum Error {
    /// The document could not be opened or rendered. Fatal to the session;
    /// the caller must load a different reference.
    #[error("document cannot be opened: {0}")]
    Load(String),

    /// An operation other than `load_document` was attempted with no
    /// document loaded.
    #[error("no document is loaded")]
    NoActiveSession,

    /// An operation was attempted while a document load is still in flight.
    #[error("document load has not completed")]
    SessionNotReady,

    /// There is no page in the requested direction. Expected at the first
    /// and last page; the session is left unchanged.
    #[error("no page in that direction")]
    NavigationBoundary,

    /// The engine's structural index has no spine entry for the given href.
    #[error("no spine entry for table of contents href {0:?}")]
    UnknownTocEntry(String),

    /// A single substructure failed to load or scan during a search. Always
    /// recovered locally; the aggregate search still succeeds.
    #[error("search failed in substructure {index}: {message}")]
    SearchScan { index: usize, message: String },

    /// The bookmark persistence service is unavailable or the stored record
    /// is unreadable. Bookmark operations fail individually; navigation and
    /// theming remain usable.
    #[error("bookmark storage unavailable")]
    Storage(#[from] StoreError),

    /// Any other asynchronous engine failure.
    #[error("rendering engine failure: {0}")]
    Engine(String),
}

/// Failures from a [`crate::KeyValueStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend i/o failure")]
    Io(#[from] std::io::Error),

    #[error("stored bookmark record is malformed")]
    Record(#[from] serde_json::Error),
}

/// Failures reported by the rendering engine across the trait boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("document cannot be opened: {0}")]
    Open(String),

    /// Relative navigation was requested at the first or last page.
    #[error("no page in that direction")]
    Boundary,

    #[error("{0}")]
    Failed(String),
}

impl EngineError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Open(message) => Error::Load(message),
            EngineError::Boundary => Error::NavigationBoundary,
            EngineError::Failed(message) => Error::Engine(message),
        }
    }
}
