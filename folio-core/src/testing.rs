//! Scripted fakes for the rendering-engine boundary, shared by the session
//! and search test modules.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::engine::{
    DocumentEngine, EngineProvider, EngineResult, Location, LocationEdge, PageProgress, Rendition,
    RuleSet, SpineMatch,
};
use crate::error::EngineError;
use crate::{DocumentMetadata, Position, TocEntry, Viewport};

const PAGES_PER_CHAPTER: usize = 2;

pub struct FakeEngineBuilder {
    chapters: Vec<ChapterSpec>,
    metadata: Option<DocumentMetadata>,
    fail_metadata: bool,
}

struct ChapterSpec {
    href: String,
    text: String,
    fail_scan: bool,
}

impl FakeEngineBuilder {
    pub fn chapter(mut self, href: &str, text: &str) -> Self {
        self.chapters.push(ChapterSpec {
            href: href.to_owned(),
            text: text.to_owned(),
            fail_scan: false,
        });
        self
    }

    pub fn failing_chapter(mut self, href: &str) -> Self {
        self.chapters.push(ChapterSpec {
            href: href.to_owned(),
            text: String::new(),
            fail_scan: true,
        });
        self
    }

    pub fn metadata(mut self, title: &str, creator: &str) -> Self {
        self.metadata = Some(DocumentMetadata {
            title: Some(title.to_owned()),
            creator: Some(creator.to_owned()),
        });
        self
    }

    pub fn fail_metadata(mut self) -> Self {
        self.fail_metadata = true;
        self
    }

    pub fn build(self) -> FakeEngine {
        let mut pages = Vec::new();
        for (index, spec) in self.chapters.iter().enumerate() {
            for page in 0..PAGES_PER_CHAPTER {
                pages.push(Page {
                    cursor: Position::new(format!(
                        "epubcfi(/6/{}[{}]!/4/{})",
                        2 * index + 4,
                        spec.href,
                        2 * page + 2
                    )),
                    chapter: index,
                    page_in_chapter: page as u32,
                    label: format!("Chapter {}", index + 1),
                });
            }
        }
        FakeEngine {
            chapters: self
                .chapters
                .into_iter()
                .map(|spec| FakeChapter {
                    href: spec.href,
                    text: spec.text,
                    fail_scan: spec.fail_scan,
                    loaded: AtomicBool::new(false),
                })
                .collect(),
            metadata: self.metadata,
            fail_metadata: self.fail_metadata,
            spine_events: Mutex::new(Vec::new()),
            rendition: Arc::new(FakeRendition {
                pages,
                current: Mutex::new(0),
                events: Mutex::new(Vec::new()),
            }),
        }
    }
}

struct FakeChapter {
    href: String,
    text: String,
    fail_scan: bool,
    loaded: AtomicBool,
}

pub struct FakeEngine {
    chapters: Vec<FakeChapter>,
    metadata: Option<DocumentMetadata>,
    fail_metadata: bool,
    spine_events: Mutex<Vec<String>>,
    rendition: Arc<FakeRendition>,
}

impl FakeEngine {
    pub fn builder() -> FakeEngineBuilder {
        FakeEngineBuilder {
            chapters: Vec::new(),
            metadata: None,
            fail_metadata: false,
        }
    }

    pub fn rendition(&self) -> Arc<FakeRendition> {
        Arc::clone(&self.rendition)
    }

    pub fn spine_events(&self) -> Vec<String> {
        self.spine_events.lock().clone()
    }

    pub async fn preload(&self, index: usize) {
        self.load_substructure(index).await.unwrap();
    }
}

#[async_trait]
impl DocumentEngine for FakeEngine {
    async fn render_to(
        &self,
        _host_id: &str,
        _viewport: Viewport,
    ) -> EngineResult<Arc<dyn Rendition>> {
        Ok(Arc::clone(&self.rendition) as Arc<dyn Rendition>)
    }

    async fn metadata(&self) -> EngineResult<DocumentMetadata> {
        if self.fail_metadata {
            return Err(EngineError::failed("metadata unavailable"));
        }
        Ok(self.metadata.clone().unwrap_or_default())
    }

    fn toc(&self) -> Vec<TocEntry> {
        self.chapters
            .iter()
            .enumerate()
            .map(|(index, chapter)| TocEntry {
                label: format!("Chapter {}", index + 1),
                href: chapter.href.clone(),
            })
            .collect()
    }

    fn spine_index(&self, href: &str) -> Option<usize> {
        self.chapters.iter().position(|chapter| chapter.href == href)
    }

    fn substructure_count(&self) -> usize {
        self.chapters.len()
    }

    fn is_substructure_loaded(&self, index: usize) -> bool {
        self.chapters[index].loaded.load(Ordering::SeqCst)
    }

    async fn load_substructure(&self, index: usize) -> EngineResult<()> {
        self.spine_events.lock().push(format!("load:{index}"));
        self.chapters[index].loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn scan_substructure(&self, index: usize, query: &str) -> EngineResult<Vec<SpineMatch>> {
        let chapter = &self.chapters[index];
        if !chapter.loaded.load(Ordering::SeqCst) {
            return Err(EngineError::failed("substructure not loaded"));
        }
        if chapter.fail_scan {
            return Err(EngineError::failed("scan failed"));
        }
        let matches = chapter
            .text
            .match_indices(query)
            .map(|(offset, hit)| SpineMatch {
                cursor: Position::new(format!(
                    "epubcfi(/6/{}[{}]!/2/{offset})",
                    2 * index + 4,
                    chapter.href
                )),
                excerpt: excerpt_around(&chapter.text, offset, hit.len()),
            })
            .collect();
        Ok(matches)
    }

    async fn unload_substructure(&self, index: usize) -> EngineResult<()> {
        self.spine_events.lock().push(format!("unload:{index}"));
        self.chapters[index].loaded.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn excerpt_around(text: &str, offset: usize, len: usize) -> String {
    let mut start = offset.saturating_sub(20);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (offset + len + 20).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].to_owned()
}

struct Page {
    cursor: Position,
    chapter: usize,
    page_in_chapter: u32,
    label: String,
}

pub struct FakeRendition {
    pages: Vec<Page>,
    current: Mutex<usize>,
    events: Mutex<Vec<String>>,
}

impl FakeRendition {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn current_page(&self) -> usize {
        *self.current.lock()
    }

    pub fn cursor_at(&self, page: usize) -> Position {
        self.pages[page].cursor.clone()
    }

    fn record(&self, event: String) {
        self.events.lock().push(event);
    }
}

#[async_trait]
impl Rendition for FakeRendition {
    async fn display_initial(&self) -> EngineResult<()> {
        *self.current.lock() = 0;
        self.record("display:initial".to_owned());
        Ok(())
    }

    async fn display_index(&self, index: usize) -> EngineResult<()> {
        let page = self
            .pages
            .iter()
            .position(|p| p.chapter == index)
            .ok_or_else(|| EngineError::failed(format!("no spine item {index}")))?;
        *self.current.lock() = page;
        self.record(format!("display:index:{index}"));
        Ok(())
    }

    async fn display_position(&self, position: &Position) -> EngineResult<()> {
        let page = self
            .pages
            .iter()
            .position(|p| p.cursor == *position)
            .ok_or_else(|| EngineError::failed(format!("unknown cursor {position}")))?;
        *self.current.lock() = page;
        self.record(format!("display:pos:{position}"));
        Ok(())
    }

    async fn next(&self) -> EngineResult<()> {
        let mut current = self.current.lock();
        if *current + 1 >= self.pages.len() {
            return Err(EngineError::Boundary);
        }
        *current += 1;
        self.record("next".to_owned());
        Ok(())
    }

    async fn prev(&self) -> EngineResult<()> {
        let mut current = self.current.lock();
        if *current == 0 {
            return Err(EngineError::Boundary);
        }
        *current -= 1;
        self.record("prev".to_owned());
        Ok(())
    }

    fn resize(&self, viewport: Viewport) {
        self.record(format!("resize:{}x{}", viewport.width, viewport.height));
    }

    fn current_location(&self) -> EngineResult<Location> {
        let page = &self.pages[*self.current.lock()];
        let edge = LocationEdge {
            cursor: page.cursor.clone(),
            displayed: Some(PageProgress {
                page: page.page_in_chapter + 1,
                total: PAGES_PER_CHAPTER as u32,
            }),
        };
        Ok(Location {
            start: edge.clone(),
            end: edge,
            chapter_label: Some(page.label.clone()),
        })
    }

    async fn register_presentation_rule(&self, name: &str, _rule: &RuleSet) -> EngineResult<()> {
        self.record(format!("register:{name}"));
        Ok(())
    }

    fn select_presentation_rule(&self, name: &str) {
        self.record(format!("select:{name}"));
    }
}

/// Provider over a prebuilt engine; `FakeProvider::failing()` rejects every
/// reference the way an unparseable container would.
pub struct FakeProvider {
    engine: Option<Arc<FakeEngine>>,
}

impl FakeProvider {
    pub fn new(engine: Arc<FakeEngine>) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    pub fn failing() -> Self {
        Self { engine: None }
    }
}

#[async_trait]
impl EngineProvider for FakeProvider {
    async fn open(&self, reference: &str) -> EngineResult<Arc<dyn DocumentEngine>> {
        match &self.engine {
            Some(engine) => Ok(Arc::clone(engine) as Arc<dyn DocumentEngine>),
            None => Err(EngineError::Open(format!("cannot parse {reference}"))),
        }
    }
}
