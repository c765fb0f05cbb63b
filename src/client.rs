use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::ContentApi;
use crate::config::Config;
use crate::error::ApiError;
use crate::types::{AnimeInfo, MangaInfo, Page, WatchResponse};

/// HTTP client for a Consumet-style API (anilist meta for anime, anilist-manga for manga).
#[derive(Debug, Clone)]
pub struct ConsumetClient {
    http: Client,
    anime_base: Url,
    manga_base: Url,
    provider: String,
}

impl ConsumetClient {
    pub fn new(http: Client, anime_base: Url, manga_base: Url, provider: impl Into<String>) -> Self {
        Self { http, anime_base, manga_base, provider: provider.into() }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .timeout(Duration::from_secs(cfg.request_timeout_secs.max(1)))
            .build()?;
        Ok(Self::new(
            http,
            Url::parse(&cfg.anime_api_url)?,
            Url::parse(&cfg.manga_api_url)?,
            cfg.manga_provider.clone(),
        ))
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn anime_info_url(&self, anime_id: &str) -> Result<Url, ApiError> {
        endpoint(&self.anime_base, &["info", anime_id])
    }

    pub fn watch_url(&self, episode_id: &str) -> Result<Url, ApiError> {
        endpoint(&self.anime_base, &["watch", episode_id])
    }

    pub fn manga_info_url(&self, manga_id: &str) -> Result<Url, ApiError> {
        let mut url = endpoint(&self.manga_base, &["info", manga_id])?;
        url.query_pairs_mut().append_pair("provider", &self.provider);
        Ok(url)
    }

    pub fn read_url(&self, chapter_id: &str) -> Result<Url, ApiError> {
        let mut url = endpoint(&self.manga_base, &["read"])?;
        url.query_pairs_mut()
            .append_pair("chapterId", chapter_id)
            .append_pair("provider", &self.provider);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let shown = url.to_string();
        tracing::debug!(url = %shown, "GET");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::network(&shown, &e))?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| ApiError::network(&shown, &e))?;
        if !status.is_success() {
            return Err(ApiError::from_status(shown, status.as_u16(), &String::from_utf8_lossy(&body)));
        }
        serde_json::from_slice(&body).map_err(|source| ApiError::Decode { url: shown, source })
    }
}

#[async_trait]
impl ContentApi for ConsumetClient {
    async fn anime_info(&self, anime_id: &str) -> Result<AnimeInfo, ApiError> {
        self.get_json(self.anime_info_url(anime_id)?).await
    }

    async fn watch(&self, episode_id: &str) -> Result<WatchResponse, ApiError> {
        self.get_json(self.watch_url(episode_id)?).await
    }

    async fn manga_info(&self, manga_id: &str) -> Result<MangaInfo, ApiError> {
        self.get_json(self.manga_info_url(manga_id)?).await
    }

    async fn read(&self, chapter_id: &str) -> Result<Vec<Page>, ApiError> {
        self.get_json(self.read_url(chapter_id)?).await
    }
}

// Appends percent-encoded path segments to `base`, tolerating a trailing slash.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}
