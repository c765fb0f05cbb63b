use std::sync::Arc;

use url::Url;

use crate::api::ContentApi;
use crate::error::ApiError;
use crate::metadata::{MetadataWriter, PageMetadata};
use crate::navigation::{Bounds, Step};
use crate::resolver;
use crate::routes::{self, Route};
use crate::state::{Generation, GenerationCounter, Phase};
use crate::types::{Chapter, MangaInfo, Page};

/// Where page images are fetched through.
#[derive(Debug, Clone)]
pub struct ImageProxy {
    pub endpoint: Url,
    pub referer: String,
}

impl ImageProxy {
    pub fn url_for(&self, img: &str) -> Url {
        routes::proxied_image_url(&self.endpoint, img, &self.referer)
    }
}

/// A page image ready to render, keyed by its position in the chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxiedPage {
    pub index: usize,
    pub url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: Generation,
    pub chapter_id: String,
}

/// Controller behind `/manga-reader/:mangaId/:chapterId`.
pub struct MangaReader<A: ?Sized> {
    api: Arc<A>,
    site_name: String,
    proxy: ImageProxy,
    metadata: MetadataWriter,
    manga_id: String,
    chapter_segment: String,
    manga: Option<MangaInfo>,
    index: Option<usize>,
    pages: Vec<Page>,
    phase: Phase,
    generations: GenerationCounter,
}

impl<A: ContentApi + ?Sized> MangaReader<A> {
    /// `chapter_segment` is the chapter id as it appears in the route (percent-encoded).
    pub fn new(
        api: Arc<A>,
        site_name: impl Into<String>,
        proxy: ImageProxy,
        metadata: MetadataWriter,
        manga_id: impl Into<String>,
        chapter_segment: impl Into<String>,
    ) -> Self {
        Self {
            api,
            site_name: site_name.into(),
            proxy,
            metadata,
            manga_id: manga_id.into(),
            chapter_segment: chapter_segment.into(),
            manga: None,
            index: None,
            pages: Vec::new(),
            phase: Phase::Idle,
            generations: GenerationCounter::default(),
        }
    }

    pub async fn mount(&mut self) {
        self.load_parent().await;
        self.load_pages().await;
    }

    /// Follow a route change; a different manga id restarts from `Idle`.
    pub async fn open(&mut self, manga_id: &str, chapter_segment: &str) {
        if manga_id == self.manga_id && self.manga.is_some() {
            self.chapter_segment = chapter_segment.to_string();
            self.index = self
                .manga
                .as_ref()
                .and_then(|m| resolver::chapter_index(&m.chapters, chapter_segment));
            self.publish_metadata();
            self.load_pages().await;
            return;
        }
        self.reset(manga_id, chapter_segment);
        self.mount().await;
    }

    pub fn reset(&mut self, manga_id: &str, chapter_segment: &str) {
        self.manga_id = manga_id.to_string();
        self.chapter_segment = chapter_segment.to_string();
        self.manga = None;
        self.index = None;
        self.pages.clear();
        self.phase = Phase::Idle;
        self.generations.advance();
    }

    pub async fn load_parent(&mut self) {
        self.phase = Phase::LoadingParent;
        match self.api.manga_info(&self.manga_id).await {
            Ok(info) => {
                self.index = resolver::chapter_index(&info.chapters, &self.chapter_segment);
                tracing::debug!(
                    manga = %self.manga_id,
                    chapters = info.chapters.len(),
                    index = ?self.index,
                    "chapter list loaded"
                );
                self.manga = Some(info);
                self.phase = Phase::ParentLoaded;
                self.publish_metadata();
            }
            Err(e) => {
                tracing::warn!(manga = %self.manga_id, error = %e, "manga info fetch failed");
                self.manga = None;
                self.index = None;
                self.phase = Phase::Failed(e.display_message());
            }
        }
    }

    /// Issue a page request for the resolved chapter, discarding the pages on screen.
    pub fn begin_pages(&mut self) -> Option<PageRequest> {
        let manga = self.manga.as_ref()?;
        let chapter_id = self.index.and_then(|i| manga.chapters.get(i)).map(|c| c.id.clone());
        self.pages.clear();
        let generation = self.generations.advance();
        let Some(chapter_id) = chapter_id else {
            self.phase = Phase::Unresolved { requested: self.decoded_segment() };
            return None;
        };
        self.phase = Phase::LoadingContent;
        Some(PageRequest { generation, chapter_id })
    }

    pub fn apply_pages(&mut self, generation: Generation, result: Result<Vec<Page>, ApiError>) -> bool {
        if !self.generations.is_current(generation) {
            tracing::debug!(?generation, "discarding stale page response");
            return false;
        }
        match result {
            Ok(pages) => {
                self.pages = pages;
                self.phase = Phase::ContentLoaded;
            }
            Err(e) => {
                tracing::warn!(manga = %self.manga_id, error = %e, "page fetch failed");
                self.phase = Phase::Failed(e.display_message());
            }
        }
        true
    }

    pub async fn load_pages(&mut self) {
        if let Some(req) = self.begin_pages() {
            self.fetch(req).await;
        }
    }

    async fn fetch(&mut self, req: PageRequest) {
        let result = self.api.read(&req.chapter_id).await;
        self.apply_pages(req.generation, result);
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::of(self.index, self.chapters().len())
    }

    /// Move one chapter along the list and issue its page request. `None` at the edges.
    pub fn step(&mut self, step: Step) -> Option<PageRequest> {
        let target = self.bounds().target(step)?;
        self.index = Some(target);
        self.chapter_segment = urlencoding::encode(&self.chapters()[target].id).into_owned();
        self.publish_metadata();
        self.begin_pages()
    }

    pub async fn navigate(&mut self, step: Step) -> bool {
        match self.step(step) {
            Some(req) => {
                self.fetch(req).await;
                true
            }
            None => false,
        }
    }

    pub async fn next(&mut self) -> bool {
        self.navigate(Step::Next).await
    }

    pub async fn prev(&mut self) -> bool {
        self.navigate(Step::Prev).await
    }

    fn publish_metadata(&self) {
        let Some(manga) = &self.manga else { return };
        let title = manga.title.display();
        let chapter = match self.current_chapter().and_then(|c| c.chapter_number.as_deref()) {
            Some(n) => format!("{title} Chapter {n}"),
            None => title.to_string(),
        };
        self.metadata.publish(PageMetadata {
            title: format!("{} - {}", self.site_name, chapter),
            description: format!("Read {chapter} for free."),
            image: manga.image.clone(),
        });
    }

    /// Proxied page URLs in reading order.
    pub fn proxied_pages(&self) -> Vec<ProxiedPage> {
        self.pages
            .iter()
            .enumerate()
            .map(|(index, p)| ProxiedPage { index, url: self.proxy.url_for(&p.img) })
            .collect()
    }

    pub fn route(&self) -> Route {
        Route::MangaReader { manga_id: self.manga_id.clone(), chapter_id: self.chapter_segment.clone() }
    }

    fn decoded_segment(&self) -> String {
        urlencoding::decode(&self.chapter_segment)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| self.chapter_segment.clone())
    }

    pub fn title(&self) -> &str {
        self.manga.as_ref().map(|m| m.title.display()).unwrap_or("")
    }

    pub fn manga_id(&self) -> &str {
        &self.manga_id
    }

    pub fn manga(&self) -> Option<&MangaInfo> {
        self.manga.as_ref()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn chapters(&self) -> &[Chapter] {
        self.manga.as_ref().map(|m| m.chapters.as_slice()).unwrap_or(&[])
    }

    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.index.and_then(|i| self.chapters().get(i))
    }
}
