use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::{DocumentMetadata, Position, TocEntry, Viewport};

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Opens document references into engine handles.
#[async_trait]
pub trait EngineProvider: Send + Sync {
    async fn open(&self, reference: &str) -> EngineResult<Arc<dyn DocumentEngine>>;
}

/// An open document inside the rendering engine.
///
/// The substructure methods are the only way the session reaches the
/// document's spine: one ordered sub-unit per index, loadable and unloadable
/// independently so a search never has to hold the whole document resident.
#[async_trait]
pub trait DocumentEngine: Send + Sync {
    /// Lays the document out into the host element and returns the
    /// view-scoped handle used for navigation and presentation rules.
    async fn render_to(&self, host_id: &str, viewport: Viewport)
        -> EngineResult<Arc<dyn Rendition>>;

    async fn metadata(&self) -> EngineResult<DocumentMetadata>;

    fn toc(&self) -> Vec<TocEntry>;

    /// Resolves a table-of-contents href to an absolute spine index.
    fn spine_index(&self, href: &str) -> Option<usize>;

    fn substructure_count(&self) -> usize;

    fn is_substructure_loaded(&self, index: usize) -> bool;

    async fn load_substructure(&self, index: usize) -> EngineResult<()>;

    /// Scans one substructure for `query`. The substructure must be loaded.
    async fn scan_substructure(&self, index: usize, query: &str)
        -> EngineResult<Vec<SpineMatch>>;

    async fn unload_substructure(&self, index: usize) -> EngineResult<()>;
}

/// View-scoped rendering handle. Presentation rules selected here apply only
/// to the currently displayed view and must be reasserted after every page
/// transition.
#[async_trait]
pub trait Rendition: Send + Sync {
    async fn display_initial(&self) -> EngineResult<()>;

    async fn display_index(&self, index: usize) -> EngineResult<()>;

    async fn display_position(&self, position: &Position) -> EngineResult<()>;

    /// Advances one page. Returns [`EngineError::Boundary`] at the last page.
    async fn next(&self) -> EngineResult<()>;

    /// Goes back one page. Returns [`EngineError::Boundary`] at the first page.
    async fn prev(&self) -> EngineResult<()>;

    fn resize(&self, viewport: Viewport);

    fn current_location(&self) -> EngineResult<Location>;

    async fn register_presentation_rule(&self, name: &str, rule: &RuleSet) -> EngineResult<()>;

    fn select_presentation_rule(&self, name: &str);
}

/// One match reported by [`DocumentEngine::scan_substructure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineMatch {
    pub cursor: Position,
    pub excerpt: String,
}

/// The engine's location cursor for the displayed view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub start: LocationEdge,
    pub end: LocationEdge,
    /// Label of the table-of-contents entry covering the displayed range,
    /// when the engine can resolve one.
    pub chapter_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationEdge {
    pub cursor: Position,
    pub displayed: Option<PageProgress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub page: u32,
    pub total: u32,
}

/// A declarative presentation rule set: selector to property/value
/// declarations, registered with the engine under a unique name and selected
/// later by that name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(BTreeMap<String, BTreeMap<String, String>>);

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(mut self, selector: &str, property: &str, value: &str) -> Self {
        self.0
            .entry(selector.to_owned())
            .or_default()
            .insert(property.to_owned(), value.to_owned());
        self
    }

    pub fn selectors(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, String>)> {
        self.0.iter().map(|(selector, decls)| (selector.as_str(), decls))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
