use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::api::ContentApi;
use crate::download::{DownloadRequest, Downloader};
use crate::error::ApiError;
use crate::navigation::{Bounds, Step};
use crate::resolver;
use crate::state::{Generation, GenerationCounter, Phase};
use crate::types::{AnimeInfo, Episode, StreamSource, WatchResponse};

/// In-flight stream lookup for one resolved episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub generation: Generation,
    pub episode_id: String,
}

/// Controller behind `/episode/:animeId/:episodeNumber`.
pub struct EpisodeScreen<A: ?Sized> {
    api: Arc<A>,
    site_name: String,
    anime_id: String,
    requested: String,
    anime: Option<AnimeInfo>,
    current: Option<usize>,
    streams: Vec<StreamSource>,
    quality: Option<String>,
    phase: Phase,
    generations: GenerationCounter,
}

impl<A: ContentApi + ?Sized> EpisodeScreen<A> {
    pub fn new(
        api: Arc<A>,
        site_name: impl Into<String>,
        anime_id: impl Into<String>,
        episode_number: impl Into<String>,
    ) -> Self {
        Self {
            api,
            site_name: site_name.into(),
            anime_id: anime_id.into(),
            requested: episode_number.into(),
            anime: None,
            current: None,
            streams: Vec::new(),
            quality: None,
            phase: Phase::Idle,
            generations: GenerationCounter::default(),
        }
    }

    /// Fetch the anime and its episode list, then streams for the requested episode.
    pub async fn mount(&mut self) {
        self.load_parent().await;
        self.load_streams().await;
    }

    /// Follow a route change. Same anime: only the episode changes. Otherwise start over.
    pub async fn open(&mut self, anime_id: &str, episode_number: &str) {
        if anime_id == self.anime_id && self.anime.is_some() {
            self.requested = episode_number.to_string();
            self.load_streams().await;
            return;
        }
        self.reset(anime_id, episode_number);
        self.mount().await;
    }

    pub fn reset(&mut self, anime_id: &str, episode_number: &str) {
        self.anime_id = anime_id.to_string();
        self.requested = episode_number.to_string();
        self.anime = None;
        self.current = None;
        self.streams.clear();
        self.quality = None;
        self.phase = Phase::Idle;
        // Anything still in flight belongs to the old anime.
        self.generations.advance();
    }

    pub async fn load_parent(&mut self) {
        self.phase = Phase::LoadingParent;
        match self.api.anime_info(&self.anime_id).await {
            Ok(info) => {
                tracing::debug!(anime = %self.anime_id, episodes = info.episodes.len(), "episode list loaded");
                self.anime = Some(info);
                self.phase = Phase::ParentLoaded;
            }
            Err(e) => {
                tracing::warn!(anime = %self.anime_id, error = %e, "anime info fetch failed");
                self.anime = None;
                self.phase = Phase::Failed(e.display_message());
            }
        }
    }

    /// Resolve the requested number against the list and, on a match, issue a stream request.
    ///
    /// Returns `None` before the list is loaded or when the number is not in it.
    pub fn begin_streams(&mut self) -> Option<StreamRequest> {
        let anime = self.anime.as_ref()?;
        let resolved = resolver::episode_index(&anime.episodes, &self.requested)
            .map(|i| (i, anime.episodes[i].id.clone()));
        self.streams.clear();
        self.quality = None;
        // Supersedes whatever is in flight, even when nothing new is issued.
        let generation = self.generations.advance();
        let Some((index, episode_id)) = resolved else {
            self.current = None;
            self.phase = Phase::Unresolved { requested: self.requested.clone() };
            return None;
        };
        self.current = Some(index);
        self.phase = Phase::LoadingContent;
        Some(StreamRequest { generation, episode_id })
    }

    /// Store a stream response. Responses for superseded requests are dropped; returns whether applied.
    pub fn apply_streams(&mut self, generation: Generation, result: Result<WatchResponse, ApiError>) -> bool {
        if !self.generations.is_current(generation) {
            tracing::debug!(?generation, "discarding stale stream response");
            return false;
        }
        match result {
            Ok(watch) => {
                self.quality = watch.sources.first().map(|s| s.quality.clone());
                self.streams = watch.sources;
                self.phase = Phase::ContentLoaded;
            }
            Err(e) => {
                tracing::warn!(anime = %self.anime_id, episode = %self.requested, error = %e, "stream fetch failed");
                self.phase = Phase::Failed(e.display_message());
            }
        }
        true
    }

    pub async fn load_streams(&mut self) {
        if let Some(req) = self.begin_streams() {
            self.fetch(req).await;
        }
    }

    async fn fetch(&mut self, req: StreamRequest) {
        let result = self.api.watch(&req.episode_id).await;
        self.apply_streams(req.generation, result);
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::of(self.current, self.episodes().len())
    }

    /// Move the requested number one position along the list and issue the stream request.
    /// `None` at the edges, leaving state untouched.
    pub fn step(&mut self, step: Step) -> Option<StreamRequest> {
        let target = self.bounds().target(step)?;
        self.requested = self.episodes()[target].number.to_string();
        self.begin_streams()
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

    /// Switch playback quality. Never refetches; unknown labels are rejected.
    pub fn select_quality(&mut self, quality: &str) -> bool {
        if !self.streams.iter().any(|s| s.quality == quality) {
            return false;
        }
        self.quality = Some(quality.to_string());
        true
    }

    pub fn selected_stream(&self) -> Option<&StreamSource> {
        let q = self.quality.as_deref()?;
        self.streams.iter().find(|s| s.quality == q)
    }

    /// URL and file name for the selected quality, if there is one.
    pub fn download_request(&self) -> Option<DownloadRequest> {
        let stream = self.selected_stream()?;
        let episode = self.current_episode()?;
        Some(DownloadRequest {
            url: stream.url.clone(),
            filename: format!("{}_episode_{}[{}]", self.title(), episode.number, self.site_name),
        })
    }

    /// Hand the selected stream to `downloader`. `Ok(None)` when nothing matches.
    pub async fn download<D: Downloader + ?Sized>(&self, downloader: &D) -> Result<Option<PathBuf>> {
        let Some(req) = self.download_request() else {
            tracing::debug!(quality = ?self.quality, "no stream for selected quality; download skipped");
            return Ok(None);
        };
        let path = downloader.download(&req.url, &req.filename).await?;
        Ok(Some(path))
    }

    pub fn document_title(&self) -> String {
        match self.current_episode() {
            Some(ep) => format!("{} - {} Episode {}", self.site_name, self.title(), ep.number),
            None => format!("{} - {}", self.site_name, self.title()),
        }
    }

    pub fn title(&self) -> &str {
        self.anime.as_ref().map(|a| a.title.display()).unwrap_or("")
    }

    pub fn anime_id(&self) -> &str {
        &self.anime_id
    }

    pub fn requested(&self) -> &str {
        &self.requested
    }

    pub fn anime(&self) -> Option<&AnimeInfo> {
        self.anime.as_ref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn streams(&self) -> &[StreamSource] {
        &self.streams
    }

    pub fn quality(&self) -> Option<&str> {
        self.quality.as_deref()
    }

    pub fn episodes(&self) -> &[Episode] {
        self.anime.as_ref().map(|a| a.episodes.as_slice()).unwrap_or(&[])
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.current.and_then(|i| self.episodes().get(i))
    }
}
