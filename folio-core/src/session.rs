use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::config::ReaderConfig;
use crate::engine::{DocumentEngine, EngineProvider, Rendition};
use crate::error::{Error, Result};
use crate::search::{self, SearchResult};
use crate::store::{Bookmark, BookmarkStore, KeyValueStore};
use crate::theme::{self, ThemeSnapshot, ThemeValue};
use crate::{Direction, DocumentMetadata, Position, TocEntry, Viewport};

/// Session lifecycle. Only `load_document` is permitted outside `Ready`;
/// everything else fails fast instead of silently doing nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unloaded,
    Loading,
    Ready,
}

/// Owns the state of one open document and sequences every navigation,
/// theme, bookmark and search intent against the rendering engine.
///
/// One instance per open document; loading a new document fully replaces the
/// previous session. State-mutating operations take `&mut self`, so a second
/// navigation cannot start while one is in flight — the exclusive borrow is
/// the single-slot pending-operation guard.
pub struct ReadingSession {
    store: Arc<dyn KeyValueStore>,
    default_theme: ThemeSnapshot,
    state: SessionState,
    active: Option<ActiveDocument>,
}

struct ActiveDocument {
    reference: String,
    engine: Arc<dyn DocumentEngine>,
    rendition: Arc<dyn Rendition>,
    metadata: Option<DocumentMetadata>,
    marks: BookmarkStore,
    bookmarks: Vec<Bookmark>,
    current_bookmarked: bool,
    theme: ThemeSnapshot,
    themes_registered: bool,
}

impl ReadingSession {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            default_theme: ThemeSnapshot::default(),
            state: SessionState::Unloaded,
            active: None,
        }
    }

    pub fn with_config(store: Arc<dyn KeyValueStore>, config: &ReaderConfig) -> Self {
        Self {
            default_theme: config.initial_theme(),
            ..Self::new(store)
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn current_theme(&self) -> Option<ThemeSnapshot> {
        self.active.as_ref().map(|doc| doc.theme)
    }

    pub fn is_current_position_bookmarked(&self) -> bool {
        self.active
            .as_ref()
            .map_or(false, |doc| doc.current_bookmarked)
    }

    /// Bookmarks of the open document, oldest first.
    pub fn bookmarks(&self) -> &[Bookmark] {
        self.active
            .as_ref()
            .map_or(&[], |doc| doc.bookmarks.as_slice())
    }

    /// Resolved metadata, if the fetch has succeeded.
    pub fn metadata(&self) -> Option<&DocumentMetadata> {
        self.active.as_ref().and_then(|doc| doc.metadata.as_ref())
    }

    pub fn toc(&self) -> Vec<TocEntry> {
        self.active
            .as_ref()
            .map_or_else(Vec::new, |doc| doc.engine.toc())
    }

    /// Progress through the displayed substructure, in percent.
    pub fn progress_percent(&self) -> Option<f32> {
        let doc = self.active.as_ref()?;
        let location = doc.rendition.current_location().ok()?;
        let displayed = location.end.displayed?;
        if displayed.total == 0 {
            return None;
        }
        Some((100.0 * displayed.page as f32 / displayed.total as f32).min(100.0))
    }

    fn active(&self) -> Result<&ActiveDocument> {
        match self.state {
            SessionState::Ready => Ok(self
                .active
                .as_ref()
                .expect("ready session holds a document")),
            SessionState::Loading => Err(Error::SessionNotReady),
            SessionState::Unloaded => Err(Error::NoActiveSession),
        }
    }

    fn active_mut(&mut self) -> Result<&mut ActiveDocument> {
        match self.state {
            SessionState::Ready => Ok(self
                .active
                .as_mut()
                .expect("ready session holds a document")),
            SessionState::Loading => Err(Error::SessionNotReady),
            SessionState::Unloaded => Err(Error::NoActiveSession),
        }
    }

    /// Opens `reference`, renders it into the host element and brings the
    /// session to `Ready`. Replaces any previously open document; the old
    /// engine handles are released before the new ones are created.
    #[instrument(skip(self, provider))]
    pub async fn load_document<P: EngineProvider>(
        &mut self,
        provider: &P,
        reference: &str,
        host_id: &str,
        viewport: Viewport,
    ) -> Result<()> {
        self.active = None;
        self.state = SessionState::Loading;
        match self.open_document(provider, reference, host_id, viewport).await {
            Ok(active) => {
                self.active = Some(active);
                self.state = SessionState::Ready;
                debug!(reference, "document ready");
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Unloaded;
                Err(err)
            }
        }
    }

    async fn open_document<P: EngineProvider>(
        &self,
        provider: &P,
        reference: &str,
        host_id: &str,
        viewport: Viewport,
    ) -> Result<ActiveDocument> {
        let engine = provider
            .open(reference)
            .await
            .map_err(|err| Error::Load(err.to_string()))?;
        let rendition = engine
            .render_to(host_id, viewport)
            .await
            .map_err(|err| Error::Load(err.to_string()))?;

        // Selecting an unregistered rule is a silent no-op in the engine, so
        // every rule must be registered before the first snapshot apply.
        theme::register_all(rendition.as_ref())
            .await
            .map_err(|err| Error::Load(err.to_string()))?;

        rendition
            .display_initial()
            .await
            .map_err(|err| Error::Load(err.to_string()))?;

        let snapshot = self.default_theme;
        snapshot.apply(rendition.as_ref());

        // Metadata failure only costs the read-only metadata surface.
        let metadata = match engine.metadata().await {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                warn!(%err, reference, "metadata fetch failed");
                None
            }
        };

        let marks = BookmarkStore::for_document(Arc::clone(&self.store), reference);
        let mut active = ActiveDocument {
            reference: reference.to_owned(),
            engine,
            rendition,
            metadata,
            marks,
            bookmarks: Vec::new(),
            current_bookmarked: false,
            theme: snapshot,
            themes_registered: true,
        };
        if let Err(err) = active.reload_bookmarks() {
            warn!(%err, reference, "bookmark record unavailable");
        }
        Ok(active)
    }

    /// Moves one page forward or back. At the first or last page this
    /// surfaces [`Error::NavigationBoundary`] and leaves the session
    /// untouched.
    #[instrument(skip(self))]
    pub async fn navigate_relative(
        &mut self,
        direction: Direction,
        viewport: Option<Viewport>,
    ) -> Result<()> {
        let doc = self.active_mut()?;
        match direction {
            Direction::Next => doc.rendition.next().await?,
            Direction::Prev => doc.rendition.prev().await?,
        }
        doc.after_navigation(viewport);
        Ok(())
    }

    /// Resolves the entry against the engine's structural index and displays
    /// the target substructure.
    #[instrument(skip(self, entry), fields(href = %entry.href))]
    pub async fn navigate_to_toc_entry(&mut self, entry: &TocEntry) -> Result<()> {
        let doc = self.active_mut()?;
        let index = doc
            .engine
            .spine_index(&entry.href)
            .ok_or_else(|| Error::UnknownTocEntry(entry.href.clone()))?;
        doc.rendition.display_index(index).await?;
        doc.after_navigation(None);
        Ok(())
    }

    /// Jumps to an absolute position. When `snapshot` is given it becomes the
    /// session's current snapshot before the jump, so bookmark and
    /// search-result targets render under the presentation that was active
    /// when they were recorded. A failed jump restores the previous snapshot.
    #[instrument(skip(self, snapshot), fields(position = %position))]
    pub async fn navigate_to_position(
        &mut self,
        position: &Position,
        snapshot: Option<ThemeSnapshot>,
    ) -> Result<()> {
        let doc = self.active_mut()?;
        let previous = doc.theme;
        if let Some(snapshot) = snapshot {
            doc.theme = snapshot;
            doc.apply_theme();
        }
        if let Err(err) = doc.rendition.display_position(position).await {
            doc.theme = previous;
            doc.apply_theme();
            return Err(err.into());
        }
        doc.after_navigation(None);
        Ok(())
    }

    /// Selects one axis value. Reapplying the value already current is a
    /// no-op.
    pub fn apply_theme_axis(&mut self, value: &'static ThemeValue) -> Result<()> {
        let doc = self.active_mut()?;
        if doc.theme.get(value.axis()) == value {
            return Ok(());
        }
        doc.rendition.select_presentation_rule(value.registered_name());
        doc.theme.set(value);
        Ok(())
    }

    /// Reasserts all four axes of the current snapshot.
    pub fn apply_current_snapshot(&mut self) -> Result<()> {
        self.active()?.apply_theme();
        Ok(())
    }

    /// Bookmarks the current position, or removes the bookmark if one
    /// already exists there.
    #[instrument(skip(self))]
    pub async fn toggle_bookmark_current_position(&mut self) -> Result<()> {
        let doc = self.active_mut()?;
        let location = doc.rendition.current_location()?;
        let start = location.start.cursor.clone();
        if doc.marks.contains(&start)? {
            doc.marks.remove(&start)?;
            debug!(%start, "bookmark removed");
        } else {
            let bookmark = Bookmark::new(
                start.clone(),
                location.end.cursor,
                location.chapter_label.unwrap_or_default(),
                doc.theme,
            );
            doc.marks.put(bookmark)?;
            debug!(%start, "bookmark added");
        }
        doc.reload_bookmarks()?;
        Ok(())
    }

    /// Scans the document for `query`. An empty or whitespace-only query
    /// yields an empty result set, not an error.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let doc = self.active()?;
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(search::search(doc.engine.as_ref(), query).await)
    }
}

impl ActiveDocument {
    /// Post-navigation protocol: viewport refit, snapshot reassert (rules are
    /// view-scoped and die with the previous page), bookmark-status refresh.
    fn after_navigation(&mut self, viewport: Option<Viewport>) {
        if let Some(viewport) = viewport {
            self.rendition.resize(viewport);
        }
        self.apply_theme();
        self.refresh_bookmark_flag();
    }

    fn apply_theme(&self) {
        if !self.themes_registered {
            warn!(reference = %self.reference, "presentation rules not registered; skipping apply");
            return;
        }
        self.theme.apply(self.rendition.as_ref());
    }

    fn refresh_bookmark_flag(&mut self) {
        self.current_bookmarked = match self.rendition.current_location() {
            Ok(location) => self
                .bookmarks
                .iter()
                .any(|bookmark| bookmark.start == location.start.cursor),
            Err(err) => {
                warn!(%err, "current location unavailable");
                false
            }
        };
    }

    fn reload_bookmarks(&mut self) -> Result<()> {
        let mut bookmarks = self.marks.get_all()?;
        bookmarks.sort_by_key(|bookmark| bookmark.created_at);
        self.bookmarks = bookmarks;
        self.refresh_bookmark_flag();
        Ok(())
    }
}
